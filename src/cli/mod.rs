pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{AnalyzeArgs, CliArgs, Commands, ConfigArgs, InspectArgs, ServeArgs};
pub use output::{AnalysisReport, OutputFormat, OutputFormatter};
