use crate::config::AppConfig;
use crate::context::{AppContext, RunOverrides};
use anyhow::Result;
use log::info;

/// Checks configuration only; never opens a connection.
pub fn run(app: &AppContext, overrides: RunOverrides) -> Result<AppConfig> {
    let config = app.config(overrides)?;
    info!("Configuration OK\n{}", config);
    Ok(config)
}
