use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "jar-mavenizer")]
#[command(about = "Identify the Maven coordinates of jar files from their content")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log at debug level (RUST_LOG still wins when set).
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Analyze jar files, or folders containing jar files.
    Analyze {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Ask for coordinates of jars that were not found online.
        #[arg(short = 'i', long)]
        interactive: bool,

        /// Do not look for identical jars in remote repositories.
        #[arg(long)]
        offline: bool,

        /// Analyze at most this many jars.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Skip this many jars before analyzing.
        #[arg(long, value_name = "N", default_value_t = 0)]
        start: usize,

        /// Remote repository URLs; defaults to the Maven settings.
        #[arg(long, value_name = "URL", value_delimiter = ',')]
        remote_repos: Vec<String>,

        /// Print all candidates even when an identical jar was found online.
        #[arg(long)]
        force_detailed_output: bool,

        /// Leave jars without an identical online match out of the report.
        #[arg(long)]
        skip_not_found: bool,

        /// `<datetime>` is replaced with the current local time.
        #[arg(long, value_name = "FILE")]
        report_file: Option<String>,
    },
}
