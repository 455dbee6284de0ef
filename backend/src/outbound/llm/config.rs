//! Provider settings shared by every vendor adapter.

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use zeroize::Zeroizing;

use crate::domain::ports::LlmProviderError;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default completion token ceiling.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
/// Default whole-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 3;

/// Connection and sampling settings for one provider.
///
/// The API key is wiped from memory on drop and never printed.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Vendor credential.
    pub api_key: Zeroizing<String>,
    /// Default model id.
    pub model: String,
    /// API root; endpoint paths are appended to it.
    pub base_url: Url,
    /// Default sampling temperature.
    pub temperature: f32,
    /// Default completion token ceiling.
    pub max_tokens: u32,
    /// Whole-request timeout for one attempt.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub retries: u32,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

impl ProviderConfig {
    /// Settings with the shared defaults.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: Url) -> Self {
        Self {
            api_key: Zeroizing::new(api_key.into()),
            model: model.into(),
            base_url,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry count.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Reject settings no vendor would accept.
    pub fn validate(&self) -> Result<(), LlmProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmProviderError::config("api key must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(LlmProviderError::config("model must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LlmProviderError::config(format!(
                "temperature {} is outside [0, 2]",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(LlmProviderError::config("max tokens must be positive"));
        }
        if self.timeout.is_zero() {
            return Err(LlmProviderError::config("timeout must be positive"));
        }
        Ok(())
    }

    /// Timeout in whole seconds, for error reporting.
    pub(crate) fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }

    /// `base_url` with `path` appended, keeping any path prefix on the base.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, LlmProviderError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))
            .map_err(|error| LlmProviderError::config(format!("invalid endpoint: {error}")))
    }
}
