use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Repository analysis and deployment artifact generation
#[derive(Parser, Debug)]
#[command(
    name = "stackpilot",
    about = "Analyze a repository and generate deployment artifacts",
    version,
    author,
    long_about = "stackpilot clones a repository, detects its technology stack and writes a \
                  Dockerfile, a GitHub Actions workflow and an environment template for it. \
                  A planner and a verifier agent consult the configured LLM provider \
                  (Ollama, OpenAI, Anthropic, Gemini, xAI, Groq)."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the HTTP API",
        long_about = "Starts the HTTP API and the session retention sweeper.\n\n\
                      Examples:\n  \
                      stackpilot serve\n  \
                      stackpilot serve --bind 0.0.0.0:8080"
    )]
    Serve(ServeArgs),

    #[command(
        about = "Clone a repository and run the full analysis",
        long_about = "Clones the repository, runs the planner, analyzer, generator and verifier \
                      agents, and writes the generated files to the output directory.\n\n\
                      Examples:\n  \
                      stackpilot analyze https://github.com/acme/web\n  \
                      stackpilot analyze https://github.com/acme/private --token $GITHUB_TOKEN\n  \
                      stackpilot analyze https://github.com/acme/web --output-dir deploy --format json"
    )]
    Analyze(AnalyzeArgs),

    #[command(
        about = "Analyze a local directory without an LLM",
        long_about = "Scans, classifies and profiles a local checkout and generates artifacts. \
                      No network access and no LLM calls.\n\n\
                      Examples:\n  \
                      stackpilot inspect\n  \
                      stackpilot inspect ./my-app --format yaml"
    )]
    Inspect(InspectArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[arg(
        short = 'b',
        long,
        value_name = "ADDR",
        help = "Listen address (overrides STACKPILOT_BIND_ADDR)"
    )]
    pub bind: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(value_name = "URL", help = "Repository URL, e.g. https://github.com/owner/name")]
    pub repo_url: String,

    #[arg(
        short = 't',
        long,
        value_name = "TOKEN",
        env = "STACKPILOT_GIT_TOKEN",
        hide_env_values = true,
        help = "Access token for private repositories"
    )]
    pub token: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Write generated files to this directory"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub path: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Write generated files to this directory"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let args = CliArgs::parse_from(["stackpilot", "serve"]);
        match args.command {
            Commands::Serve(serve_args) => assert!(serve_args.bind.is_none()),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_analyze_with_options() {
        let args = CliArgs::parse_from([
            "stackpilot",
            "analyze",
            "https://github.com/acme/web",
            "--token",
            "ghp_x",
            "--output-dir",
            "out",
            "--format",
            "json",
        ]);

        match args.command {
            Commands::Analyze(analyze_args) => {
                assert_eq!(analyze_args.repo_url, "https://github.com/acme/web");
                assert_eq!(analyze_args.token.as_deref(), Some("ghp_x"));
                assert_eq!(analyze_args.output_dir, Some(PathBuf::from("out")));
                assert_eq!(analyze_args.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_analyze_requires_url() {
        assert!(CliArgs::try_parse_from(["stackpilot", "analyze"]).is_err());
    }

    #[test]
    fn test_inspect_defaults() {
        let args = CliArgs::parse_from(["stackpilot", "inspect"]);
        match args.command {
            Commands::Inspect(inspect_args) => {
                assert!(inspect_args.path.is_none());
                assert!(inspect_args.output_dir.is_none());
                assert_eq!(inspect_args.format, OutputFormatArg::Human);
            }
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_inspect_with_path() {
        let args = CliArgs::parse_from(["stackpilot", "inspect", "/tmp/repo", "-f", "yaml"]);
        match args.command {
            Commands::Inspect(inspect_args) => {
                assert_eq!(inspect_args.path, Some(PathBuf::from("/tmp/repo")));
                assert_eq!(inspect_args.format, OutputFormatArg::Yaml);
            }
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["stackpilot", "-v", "inspect"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["stackpilot", "--log-level", "debug", "config"]);
        assert_eq!(args.log_level, Some("debug".to_string()));

        assert!(CliArgs::try_parse_from(["stackpilot", "-v", "-q", "config"]).is_err());
    }
}
