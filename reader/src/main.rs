// Pathreader - Bible reader with local progress, notes and highlights
// Entry point and command dispatch

use anyhow::Context;
use clap::Parser;
use pathreader::app;
use pathreader::commands::{self, Cli};
use pathreader::config::{data_dir_from_env, ApiConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pathreader=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Pathreader");

    let mut state = app::setup(data_dir_from_env(), ApiConfig::from_env())
        .await
        .context("failed to initialize reader")?;

    let output = commands::run(&mut state, cli.command)
        .await
        .context("command failed")?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
