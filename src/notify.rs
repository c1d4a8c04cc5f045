use crate::config::TelegramConfig;
use crate::http::{truncate_for_log, MAX_ERROR_BODY_CHARS};
use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use reqwest::Client;

const PARSE_MODE: &str = "Markdown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub detail: Option<String>,
}

impl DeliveryOutcome {
    fn delivered() -> Self {
        Self {
            success: true,
            detail: None,
        }
    }

    fn failed(detail: String) -> Self {
        Self {
            success: false,
            detail: Some(detail),
        }
    }
}

/// Bot API sink. Each call is a single attempt and failures are only logged.
pub struct TelegramNotifier<'a> {
    http: &'a Client,
    config: &'a TelegramConfig,
}

impl<'a> TelegramNotifier<'a> {
    pub fn new(http: &'a Client, config: &'a TelegramConfig) -> Self {
        Self { http, config }
    }

    pub async fn send_photo(&self, photo_url: &str) -> DeliveryOutcome {
        info!("Sending photo to Telegram...");
        let form = [
            ("chat_id", self.config.chat_id.as_str()),
            ("photo", photo_url),
        ];
        self.deliver("sendPhoto", &form, "photo").await
    }

    pub async fn send_message(&self, text: &str) -> DeliveryOutcome {
        info!("Sending analysis report to Telegram...");
        let form = [
            ("chat_id", self.config.chat_id.as_str()),
            ("text", text),
            ("parse_mode", PARSE_MODE),
        ];
        self.deliver("sendMessage", &form, "message").await
    }

    async fn deliver(&self, method: &str, form: &[(&str, &str)], label: &str) -> DeliveryOutcome {
        match self.post_form(method, form).await {
            Ok(()) => DeliveryOutcome::delivered(),
            Err(err) => {
                let detail = format!("{:#}", err);
                warn!("Failed to send {}: {}", label, detail);
                DeliveryOutcome::failed(detail)
            }
        }
    }

    async fn post_form(&self, method: &str, form: &[(&str, &str)]) -> Result<()> {
        let url = format!(
            "{}/bot{}/{}",
            self.config.base_url, self.config.bot_token, method
        );
        let response = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            // The URL embeds the bot token.
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("{} request failed", method))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(anyhow!(
            "{} returned {}: {}",
            method,
            status,
            truncate_for_log(&body, MAX_ERROR_BODY_CHARS)
        ))
    }
}
