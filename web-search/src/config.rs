//! Exa connection settings.
//!
//! - `EXA_API_KEY` (required)
//! - `EXA_URL` (default `https://api.exa.ai`)
//! - `EXA_TIMEOUT_SECS` (default 20)

use crate::error::WebSearchError;

pub const EXA_URL: &str = "https://api.exa.ai";

#[derive(Clone, Debug, PartialEq)]
pub struct ExaConfig {
    pub api_key: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl ExaConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: EXA_URL.to_string(),
            timeout_secs: 20,
        }
    }

    /// Reads the config from the process environment.
    ///
    /// # Errors
    /// [`WebSearchError::Config`] when the key is missing or a value is invalid.
    pub fn from_env() -> Result<Self, WebSearchError> {
        let api_key = std::env::var("EXA_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| WebSearchError::Config("EXA_API_KEY is not set".into()))?;
        let endpoint = std::env::var("EXA_URL").unwrap_or_else(|_| EXA_URL.to_string());
        let timeout_secs = match std::env::var("EXA_TIMEOUT_SECS") {
            Ok(v) => v.trim().parse::<u64>().map_err(|e| {
                WebSearchError::Config(format!("EXA_TIMEOUT_SECS: {e}"))
            })?,
            Err(_) => 20,
        };
        let cfg = Self {
            api_key,
            endpoint,
            timeout_secs,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), WebSearchError> {
        let ep = self.endpoint.trim();
        if !(ep.starts_with("http://") || ep.starts_with("https://")) {
            return Err(WebSearchError::Config(format!(
                "EXA_URL must start with http:// or https:// (got '{ep}')"
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(WebSearchError::Config("EXA_API_KEY is empty".into()));
        }
        Ok(())
    }
}
