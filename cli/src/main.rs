use anyhow::Context;
use clap::Parser;
use infrastructure::config::Config;
use presentation::cli::{Cli, CliApp};
use shared::logging::init_logging;
use shared::types::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json_logs;
    init_logging(&config.logging.level, config.logging.json)?;
    config.validate().context("Invalid configuration")?;

    let app = CliApp::new(&config)?;
    app.run(cli.command).await
}
