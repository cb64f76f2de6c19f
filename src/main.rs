use stackpilot::cli::commands::{CliArgs, Commands};
use stackpilot::cli::handlers::{handle_analyze, handle_config, handle_inspect, handle_serve};
use stackpilot::util::{init_logging, LoggingConfig};
use stackpilot::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("stackpilot v{} starting", VERSION);

    let exit_code = match &args.command {
        Commands::Serve(serve_args) => handle_serve(serve_args).await,
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args, args.quiet).await,
        Commands::Inspect(inspect_args) => handle_inspect(inspect_args, args.quiet).await,
        Commands::Config(config_args) => handle_config(config_args),
    };

    std::process::exit(exit_code);
}
