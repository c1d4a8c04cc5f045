use thiserror::Error;

/// Failures that end the run with a non-zero exit status.
///
/// Anything recoverable (local cache writes, analysis, delivery) is absorbed
/// where it happens and never becomes a `PipelineError`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing environment variables: {}", .missing.join(", "))]
    ConfigMissing { missing: Vec<String> },

    #[error("Setting {key} {reason} (value: {value})")]
    ConfigInvalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to get chart: {reason}{}", format_body(.body))]
    ChartUnavailable {
        reason: String,
        body: Option<String>,
    },
}

impl PipelineError {
    pub fn missing_names(&self) -> &[String] {
        match self {
            Self::ConfigMissing { missing } => missing,
            _ => &[],
        }
    }
}

fn format_body(body: &Option<String>) -> String {
    match body.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!(" (response: {})", text),
        _ => String::new(),
    }
}
