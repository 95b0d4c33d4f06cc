use anyhow::Result;
use clap::Parser;
use jar_mavenizer::analyze::{self, AnalysisOptions};
use jar_mavenizer::cli::{Cli, Commands};
use jar_mavenizer::config::{self, AnalysisConfig};
use jar_mavenizer::remote::{HttpRepository, RepositorySource};
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            paths,
            interactive,
            offline,
            limit,
            start,
            remote_repos,
            force_detailed_output,
            skip_not_found,
            report_file,
        } => {
            let mut config = AnalysisConfig::default();
            let repository = if offline {
                None
            } else {
                let source = config::resolve_repository_source(&remote_repos)?;
                config.online.probe_connectivity = source == RepositorySource::Discover;
                Some(Arc::new(HttpRepository::new(source)))
            };

            let options = AnalysisOptions {
                paths,
                interactive,
                start,
                limit,
                force_detailed_output,
                skip_not_found,
                report_file: config::resolve_report_path(report_file.as_deref(), chrono::Local::now()),
                config,
            };

            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut out = io::stdout().lock();
            analyze::run(&options, repository, &mut input, &mut out).await?;
            out.flush()?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "jar_mavenizer=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
