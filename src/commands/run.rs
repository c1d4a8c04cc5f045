use crate::context::{AppContext, RunOverrides};
use crate::http::build_http_client;
use crate::pipeline::{self, Presets, RunSummary};
use anyhow::Result;
use log::info;

pub async fn run(app: &AppContext, overrides: RunOverrides) -> Result<RunSummary> {
    let config = app.config(overrides)?;
    info!(
        "Starting analysis run for {} ({})",
        config.request.symbol, config.request.interval
    );
    let http = build_http_client(config.http_timeout)?;

    let summary = pipeline::run(&http, &config, Presets::default()).await?;
    summary.log();
    info!("Workflow completed successfully.");
    Ok(summary)
}
