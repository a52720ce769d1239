//! Tracing subscriber bootstrap.

use crate::types::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "HELPDESK_LOG";

pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).or_else(|_| EnvFilter::try_new(level))?;

    // Logs go to stderr so answers on stdout stay pipeable.
    if json {
        let layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);
        Registry::default().with(filter).with(layer).try_init()?;
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);
        Registry::default().with(filter).with(layer).try_init()?;
    }

    tracing::debug!(level, json, "logging initialized");
    Ok(())
}
