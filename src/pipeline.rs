use crate::analysis::{AnalysisClient, AnalysisReport, ReportSource};
use crate::chart::{ChartArtifact, ChartClient};
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::notify::{DeliveryOutcome, TelegramNotifier};
use crate::presets::{ChartPreset, PromptTemplate, CURRENT_CHART_PRESET, CURRENT_PROMPT_TEMPLATE};
use log::{info, warn};
use reqwest::Client;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub chart: ChartArtifact,
    pub photo: DeliveryOutcome,
    pub report: AnalysisReport,
    pub message: DeliveryOutcome,
}

impl RunSummary {
    pub fn soft_failures(&self) -> usize {
        [!self.photo.success, self.report.is_fallback(), !self.message.success]
            .into_iter()
            .filter(|failed| *failed)
            .count()
    }

    pub fn log(&self) {
        info!(
            "Run summary: chart={} photo={} report={} message={}",
            self.chart.hosted_url,
            outcome_label(&self.photo),
            match &self.report.source {
                ReportSource::Model => "model",
                ReportSource::Fallback { .. } => "fallback",
            },
            outcome_label(&self.message)
        );
        if self.soft_failures() > 0 {
            warn!(
                "Completed with {} recoverable failure(s)",
                self.soft_failures()
            );
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Presets {
    pub chart: ChartPreset,
    pub prompt: PromptTemplate,
}

impl Default for Presets {
    fn default() -> Self {
        Self {
            chart: CURRENT_CHART_PRESET,
            prompt: CURRENT_PROMPT_TEMPLATE,
        }
    }
}

/// Chart, photo, analysis, message, strictly in that order. Only the chart
/// stage can fail the run.
pub async fn run(
    http: &Client,
    config: &AppConfig,
    presets: Presets,
) -> Result<RunSummary, PipelineError> {
    let request = &config.request;
    let chart = ChartClient::new(http, &config.chart, presets.chart)
        .fetch_chart(&request.symbol, &request.interval)
        .await?;

    let notifier = TelegramNotifier::new(http, &config.telegram);
    let photo = notifier.send_photo(&chart.hosted_url).await;

    let report = AnalysisClient::new(http, &config.analysis, presets.prompt)
        .analyze(&chart.hosted_url, &request.symbol)
        .await;
    let message = notifier.send_message(&report.text).await;

    Ok(RunSummary {
        chart,
        photo,
        report,
        message,
    })
}

fn outcome_label(outcome: &DeliveryOutcome) -> &'static str {
    if outcome.success {
        "delivered"
    } else {
        "failed"
    }
}
