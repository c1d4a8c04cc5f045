use crate::config::AppConfig;
use crate::error::PipelineError;
use std::collections::HashMap;
use std::path::PathBuf;

/// Command-line values that take precedence over the environment.
#[derive(Clone, Debug, Default)]
pub struct RunOverrides {
    pub symbol: Option<String>,
    pub interval: Option<String>,
    pub output: Option<PathBuf>,
}

#[derive(Clone)]
pub struct AppContext {
    settings: HashMap<String, String>,
}

impl AppContext {
    pub fn initialize(settings: HashMap<String, String>) -> Self {
        Self { settings }
    }

    /// Runs the configuration gate. Nothing touches the network before this
    /// succeeds.
    pub fn config(&self, overrides: RunOverrides) -> Result<AppConfig, PipelineError> {
        let RunOverrides {
            symbol,
            interval,
            output,
        } = overrides;
        Ok(AppConfig::from_settings_map(&self.settings)?.with_overrides(symbol, interval, output))
    }
}
