use crate::config::ChartServiceConfig;
use crate::error::PipelineError;
use crate::http::{truncate_for_log, MAX_ERROR_BODY_CHARS};
use crate::presets::{ChartPreset, Study, EXCHANGE_PREFIX};
use anyhow::{Context, Result};
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const STORAGE_PATH: &str = "/v2/tradingview/advanced-chart/storage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    pub hosted_url: String,
    pub local_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ChartRequest<'a> {
    theme: &'a str,
    interval: &'a str,
    symbol: String,
    #[serde(rename = "override")]
    overrides: ChartOverrides,
    studies: &'a [Study],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartOverrides {
    show_study_last_value: bool,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    #[serde(default)]
    url: Option<String>,
}

pub struct ChartClient<'a> {
    http: &'a Client,
    config: &'a ChartServiceConfig,
    preset: ChartPreset,
}

impl<'a> ChartClient<'a> {
    pub fn new(http: &'a Client, config: &'a ChartServiceConfig, preset: ChartPreset) -> Self {
        Self {
            http,
            config,
            preset,
        }
    }

    /// Renders the chart, returning the hosted image URL plus the path of the
    /// best-effort local copy.
    pub async fn fetch_chart(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<ChartArtifact, PipelineError> {
        info!(
            "Generating chart for {} ({}, preset {})...",
            symbol, interval, self.preset.version
        );
        let hosted_url = self.request_hosted_url(symbol, interval).await?;
        info!("Chart URL: {}", hosted_url);

        match self.save_local_copy(&hosted_url).await {
            Ok(bytes) => info!(
                "Saved chart to {} ({} bytes)",
                self.config.output_path.display(),
                bytes
            ),
            Err(err) => warn!("Failed to save local image: {:#}", err),
        }

        Ok(ChartArtifact {
            hosted_url,
            local_path: self.config.output_path.clone(),
        })
    }

    async fn request_hosted_url(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<String, PipelineError> {
        let payload = build_chart_request(&self.preset, symbol, interval);
        let url = format!("{}{}", self.config.base_url, STORAGE_PATH);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| PipelineError::ChartUnavailable {
                reason: format!("request to {} failed: {}", url, err),
                body: None,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| PipelineError::ChartUnavailable {
                reason: format!("failed to read chart response ({}): {}", status, err),
                body: None,
            })?;
        if !status.is_success() {
            return Err(PipelineError::ChartUnavailable {
                reason: format!("status {}", status),
                body: Some(truncate_for_log(&body, MAX_ERROR_BODY_CHARS)),
            });
        }

        extract_hosted_url(&body).ok_or_else(|| PipelineError::ChartUnavailable {
            reason: "response did not include a chart url".to_string(),
            body: Some(truncate_for_log(&body, MAX_ERROR_BODY_CHARS)),
        })
    }

    async fn save_local_copy(&self, hosted_url: &str) -> Result<usize> {
        let bytes = self
            .http
            .get(hosted_url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", hosted_url))?
            .error_for_status()
            .with_context(|| format!("GET {} returned error", hosted_url))?
            .bytes()
            .await
            .context("failed to read chart image body")?;
        write_artifact(&self.config.output_path, &bytes).await?;
        Ok(bytes.len())
    }
}

fn build_chart_request<'a>(
    preset: &'a ChartPreset,
    symbol: &str,
    interval: &'a str,
) -> ChartRequest<'a> {
    ChartRequest {
        theme: preset.theme,
        interval,
        symbol: format!("{}:{}", EXCHANGE_PREFIX, symbol),
        overrides: ChartOverrides {
            show_study_last_value: preset.show_study_last_value,
        },
        studies: preset.studies,
    }
}

fn extract_hosted_url(body: &str) -> Option<String> {
    serde_json::from_str::<ChartResponse>(body)
        .ok()?
        .url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
