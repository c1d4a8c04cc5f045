use crate::error::PipelineError;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const CHART_IMG_API_KEY: &str = "CHART_IMG_API_KEY";
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const GH_TOKEN: &str = "GH_TOKEN";

/// Settings that must be present before any network call is attempted.
pub const REQUIRED_SETTINGS: [&str; 4] = [
    CHART_IMG_API_KEY,
    TELEGRAM_BOT_TOKEN,
    TELEGRAM_CHAT_ID,
    GH_TOKEN,
];

const SYMBOL_KEY: &str = "SYMBOL";
const INTERVAL_KEY: &str = "INTERVAL";
const CHART_API_URL_KEY: &str = "CHART_IMG_API_URL";
const AI_API_BASE_URL_KEY: &str = "AI_API_BASE_URL";
const AI_MODEL_KEY: &str = "AI_MODEL";
const TELEGRAM_API_URL_KEY: &str = "TELEGRAM_API_URL";
const CHART_OUTPUT_PATH_KEY: &str = "CHART_OUTPUT_PATH";
const HTTP_TIMEOUT_SECS_KEY: &str = "HTTP_TIMEOUT_SECS";

pub const DEFAULT_SYMBOL: &str = "ETHUSDT";
pub const DEFAULT_INTERVAL: &str = "1h";
pub const DEFAULT_CHART_API_URL: &str = "https://api.chart-img.com";
pub const DEFAULT_AI_API_BASE_URL: &str = "https://models.inference.ai.azure.com";
pub const DEFAULT_AI_MODEL: &str = "gpt-4o";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_CHART_OUTPUT_PATH: &str = "latest_chart.png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub interval: String,
}

#[derive(Clone)]
pub struct ChartServiceConfig {
    pub base_url: String,
    pub api_key: String,
    pub output_path: PathBuf,
}

#[derive(Clone)]
pub struct AnalysisServiceConfig {
    pub base_url: String,
    pub token: String,
    pub model: String,
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub base_url: String,
    pub bot_token: String,
    pub chat_id: String,
}

/// Immutable run configuration, built once at startup and borrowed by every
/// component.
#[derive(Clone)]
pub struct AppConfig {
    pub request: AnalysisRequest,
    pub chart: ChartServiceConfig,
    pub analysis: AnalysisServiceConfig,
    pub telegram: TelegramConfig,
    pub http_timeout: Option<Duration>,
}

impl AppConfig {
    /// Validates the required settings and resolves optional ones to their
    /// defaults. Every missing required name is reported at once.
    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self, PipelineError> {
        validate_required(settings)?;

        let http_timeout = optional_setting(settings, HTTP_TIMEOUT_SECS_KEY)
            .map(|raw| parse_timeout_secs(HTTP_TIMEOUT_SECS_KEY, raw))
            .transpose()?;

        Ok(Self {
            request: AnalysisRequest {
                symbol: setting_or(settings, SYMBOL_KEY, DEFAULT_SYMBOL),
                interval: setting_or(settings, INTERVAL_KEY, DEFAULT_INTERVAL),
            },
            chart: ChartServiceConfig {
                base_url: base_url_or(settings, CHART_API_URL_KEY, DEFAULT_CHART_API_URL),
                api_key: required(settings, CHART_IMG_API_KEY),
                output_path: PathBuf::from(setting_or(
                    settings,
                    CHART_OUTPUT_PATH_KEY,
                    DEFAULT_CHART_OUTPUT_PATH,
                )),
            },
            analysis: AnalysisServiceConfig {
                base_url: base_url_or(settings, AI_API_BASE_URL_KEY, DEFAULT_AI_API_BASE_URL),
                token: required(settings, GH_TOKEN),
                model: setting_or(settings, AI_MODEL_KEY, DEFAULT_AI_MODEL),
            },
            telegram: TelegramConfig {
                base_url: base_url_or(settings, TELEGRAM_API_URL_KEY, DEFAULT_TELEGRAM_API_URL),
                bot_token: required(settings, TELEGRAM_BOT_TOKEN),
                chat_id: required(settings, TELEGRAM_CHAT_ID),
            },
            http_timeout,
        })
    }

    /// Applies command-line overrides on top of the environment values.
    pub fn with_overrides(
        mut self,
        symbol: Option<String>,
        interval: Option<String>,
        output_path: Option<PathBuf>,
    ) -> Self {
        if let Some(symbol) = symbol.and_then(|value| non_empty(&value)) {
            self.request.symbol = symbol;
        }
        if let Some(interval) = interval.and_then(|value| non_empty(&value)) {
            self.request.interval = interval;
        }
        if let Some(path) = output_path {
            self.chart.output_path = path;
        }
        self
    }
}

impl fmt::Display for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "symbol={} interval={}", self.request.symbol, self.request.interval)?;
        writeln!(
            f,
            "chart service={} key={} output={}",
            self.chart.base_url,
            redact(&self.chart.api_key),
            self.chart.output_path.display()
        )?;
        writeln!(
            f,
            "analysis endpoint={} model={} token={}",
            self.analysis.base_url,
            self.analysis.model,
            redact(&self.analysis.token)
        )?;
        write!(
            f,
            "telegram api={} bot_token={} chat_id={}",
            self.telegram.base_url,
            redact(&self.telegram.bot_token),
            self.telegram.chat_id
        )?;
        if let Some(timeout) = self.http_timeout {
            write!(f, "\nhttp timeout={}s", timeout.as_secs())?;
        }
        Ok(())
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Fails with the complete list of absent required settings, in declaration
/// order.
pub fn validate_required(settings: &HashMap<String, String>) -> Result<(), PipelineError> {
    let missing: Vec<String> = REQUIRED_SETTINGS
        .iter()
        .filter(|key| optional_setting(settings, key).is_none())
        .map(|key| key.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::ConfigMissing { missing })
    }
}

/// Snapshot of the process environment, taken once in `main`.
pub fn settings_from_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

fn optional_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn required(settings: &HashMap<String, String>, key: &str) -> String {
    // Only called after validate_required succeeded.
    optional_setting(settings, key).unwrap_or_default().to_string()
}

fn setting_or(settings: &HashMap<String, String>, key: &str, default: &str) -> String {
    optional_setting(settings, key).unwrap_or(default).to_string()
}

fn base_url_or(settings: &HashMap<String, String>, key: &str, default: &str) -> String {
    setting_or(settings, key, default)
        .trim_end_matches('/')
        .to_string()
}

fn parse_timeout_secs(key: &str, raw: &str) -> Result<Duration, PipelineError> {
    let invalid = |reason: &str| PipelineError::ConfigInvalid {
        key: key.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let secs = raw
        .parse::<u64>()
        .map_err(|_| invalid("must be a whole number of seconds"))?;
    if secs == 0 {
        return Err(invalid("must be >= 1"));
    }
    Ok(Duration::from_secs(secs))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}
