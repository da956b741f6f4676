//! assetq command-line entry point.
//!
//! Logging goes to stderr so stdout carries only command output (cache
//! paths, encoded queries, tables). Any error ends the process with a
//! non-zero status.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use assetq_core::AppConfig;

mod args;
mod commands;
mod prompt;

use args::{Cli, Commands};
use prompt::RefreshPolicy;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = AppConfig::load()?;

    match cli.command {
        Commands::Query { project, params, size, page, timeout_ms, refresh, reuse } => {
            let params = params.to_query_params()?;
            let policy = RefreshPolicy::from_flags(refresh, reuse);
            commands::query(&config, &project, &params, size, page, timeout_ms, policy).await
        }
        Commands::Encode { params } => {
            commands::encode(&config, &params.to_query_params()?);
            Ok(())
        }
        Commands::Show { project, limit } => commands::show(&config, &project, limit),
        Commands::Merge { big, small, out, key } => commands::merge(&big, &small, &out, key),
    }
}
