//! Thin process bootstrap around the research core.

use anyhow::Context;
use clap::Parser;
use sift::cli::{output::Output, Cli};
use sift::{build_gateway, Config, HttpFetcher, ResearchCoordinator, ResearchError};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "sift=debug" } else { "sift=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(!cli.no_color);
    let config = Config::from_env().context("loading configuration")?;

    let gateway = Arc::new(build_gateway(&config.gateway).context("building gateway")?);
    let fetcher = Arc::new(
        HttpFetcher::new(
            config.research.fetch_timeout,
            config.research.extract_char_limit,
        )
        .context("building fetcher")?,
    );
    let coordinator = ResearchCoordinator::new(gateway, fetcher, config.research);

    output.info(&format!("researching: {}", cli.query));
    match coordinator.research(&cli.query, cli.sub_questions).await {
        Ok(result) => {
            if result.metrics.degraded {
                output.warn("completed with reduced coverage");
            }
            output.report(&result);
            Ok(())
        }
        Err(ResearchError::NoFindings(query)) => {
            output.warn(&format!("no usable sources found for: {query}"));
            std::process::exit(1);
        }
        Err(err) => Err(err).context("research run failed"),
    }
}
