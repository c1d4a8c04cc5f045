use crate::config::AnalysisServiceConfig;
use crate::http::{truncate_for_log, MAX_ERROR_BODY_CHARS};
use crate::presets::PromptTemplate;
use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSource {
    Model,
    Fallback { reason: String },
}

/// Free-text report; the pipeline forwards `text` as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub text: String,
    pub source: ReportSource,
}

impl AnalysisReport {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ReportSource::Fallback { .. })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: String },
    ImageUrl { image_url: ImageRef<'a> },
}

#[derive(Debug, Serialize)]
struct ImageRef<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct AnalysisClient<'a> {
    http: &'a Client,
    config: &'a AnalysisServiceConfig,
    template: PromptTemplate,
}

impl<'a> AnalysisClient<'a> {
    pub fn new(
        http: &'a Client,
        config: &'a AnalysisServiceConfig,
        template: PromptTemplate,
    ) -> Self {
        Self {
            http,
            config,
            template,
        }
    }

    /// Never fails: any error is logged and replaced with the fallback report.
    pub async fn analyze(&self, image_url: &str, symbol: &str) -> AnalysisReport {
        info!(
            "Analyzing chart with {} (prompt {})...",
            self.config.model, self.template.version
        );
        match self.request_completion(image_url, symbol).await {
            Ok(text) => {
                info!("Analysis complete.");
                AnalysisReport {
                    text,
                    source: ReportSource::Model,
                }
            }
            Err(err) => {
                warn!("Failed to analyze chart: {:#}", err);
                AnalysisReport {
                    text: self.template.fallback_report.to_string(),
                    source: ReportSource::Fallback {
                        reason: format!("{:#}", err),
                    },
                }
            }
        }
    }

    async fn request_completion(&self, image_url: &str, symbol: &str) -> Result<String> {
        let request = build_chat_request(&self.template, &self.config.model, image_url, symbol);
        let url = format!("{}{}", self.config.base_url, CHAT_COMPLETIONS_PATH);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read model response")?;
        if !status.is_success() {
            return Err(anyhow!(
                "model endpoint returned {}: {}",
                status,
                truncate_for_log(&body, MAX_ERROR_BODY_CHARS)
            ));
        }

        extract_report_text(&body)
    }
}

fn build_chat_request<'a>(
    template: &PromptTemplate,
    model: &'a str,
    image_url: &'a str,
    symbol: &str,
) -> ChatRequest<'a> {
    ChatRequest {
        model,
        temperature: template.temperature,
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text {
                    text: template.render(symbol),
                },
                ContentPart::ImageUrl {
                    image_url: ImageRef { url: image_url },
                },
            ],
        }],
    }
}

fn extract_report_text(body: &str) -> Result<String> {
    let parsed: ChatResponse =
        serde_json::from_str(body).context("failed to parse model response")?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("model response contained no choices"))?;
    choice
        .message
        .content
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| anyhow!("model response contained no text content"))
}
