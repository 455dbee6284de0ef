//! Named provider lookup with one active default.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::domain::Error;
use crate::domain::ports::{LlmProvider, LlmProviderError};

/// Providers keyed by name plus the name used when a request does not pick
/// one. The active selection belongs to this instance only.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, Arc<dyn LlmProvider>>,
    active: RwLock<Option<&'static str>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("active", &self.active_name())
            .finish()
    }
}

impl ProviderRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add `provider`. The first registration becomes active;
    /// registering an existing name replaces it.
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) -> Result<(), LlmProviderError> {
        provider.validate_config()?;
        let name = provider.name();
        info!(provider = name, model = %provider.model(), "registered language model provider");
        self.providers.insert(name, provider);
        let active = self.active.get_mut().unwrap_or_else(PoisonError::into_inner);
        if active.is_none() {
            *active = Some(name);
        }
        Ok(())
    }

    /// Make `name` the default provider.
    pub fn set_provider(&self, name: &str) -> Result<(), LlmProviderError> {
        let (&key, _) = self
            .providers
            .get_key_value(name)
            .ok_or_else(|| LlmProviderError::unknown_provider(name))?;
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(key);
        Ok(())
    }

    /// Name of the active provider.
    #[must_use]
    pub fn active_name(&self) -> Option<&'static str> {
        *self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registered names in lexical order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Pick the provider for a call: the override when given, else the
    /// active provider.
    pub fn resolve(&self, requested: Option<&str>) -> Result<Arc<dyn LlmProvider>, Error> {
        if let Some(name) = requested {
            return self.providers.get(name).cloned().ok_or_else(|| {
                Error::invalid_request(format!("provider `{name}` is not configured"))
                    .with_details(serde_json::json!({ "field": "provider", "value": name }))
            });
        }
        self.active_name()
            .and_then(|name| self.providers.get(name))
            .cloned()
            .ok_or_else(|| Error::llm_request_failed("no provider configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockLlmProvider;
    use rstest::rstest;

    fn provider(name: &'static str) -> Arc<dyn LlmProvider> {
        let mut mock = MockLlmProvider::new();
        mock.expect_name().return_const(name);
        mock.expect_model().return_const(format!("{name}-model"));
        mock.expect_validate_config().returning(|| Ok(()));
        Arc::new(mock)
    }

    fn registry(names: &[&'static str]) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for name in names {
            registry.register(provider(name)).expect("register");
        }
        registry
    }

    #[rstest]
    fn first_registration_becomes_active() {
        let registry = registry(&["openai", "gemini"]);
        assert_eq!(registry.active_name(), Some("openai"));
        assert_eq!(registry.names(), vec!["gemini", "openai"]);
    }

    #[rstest]
    fn invalid_config_is_not_registered() {
        let mut mock = MockLlmProvider::new();
        mock.expect_validate_config()
            .returning(|| Err(LlmProviderError::config("api key is empty")));
        let mut registry = ProviderRegistry::new();

        let err = registry.register(Arc::new(mock)).expect_err("invalid");
        assert_eq!(err.kind(), "config");
        assert!(registry.is_empty());
        assert_eq!(registry.active_name(), None);
    }

    #[rstest]
    fn set_provider_switches_default() {
        let registry = registry(&["openai", "gemini"]);
        registry.set_provider("gemini").expect("known");
        let chosen = registry.resolve(None).expect("resolve");
        assert_eq!(chosen.name(), "gemini");
    }

    #[rstest]
    fn set_provider_rejects_unknown_names() {
        let registry = registry(&["openai"]);
        let err = registry.set_provider("anthropic").expect_err("unknown");
        assert_eq!(err, LlmProviderError::unknown_provider("anthropic"));
        assert_eq!(registry.active_name(), Some("openai"));
    }

    #[rstest]
    fn request_override_beats_active() {
        let registry = registry(&["openai", "anthropic"]);
        let chosen = registry.resolve(Some("anthropic")).expect("resolve");
        assert_eq!(chosen.name(), "anthropic");
    }

    #[rstest]
    fn unknown_override_is_a_bad_request() {
        let registry = registry(&["openai"]);
        let err = registry.resolve(Some("mistral")).err().expect("unknown");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn empty_registry_fails_the_request() {
        let err = ProviderRegistry::new().resolve(None).err().expect("empty");
        assert_eq!(err.code(), ErrorCode::LlmRequestFailed);
        assert_eq!(err.message(), "no provider configured");
    }

    #[rstest]
    fn instances_do_not_share_selection() {
        let first = registry(&["openai", "gemini"]);
        let second = registry(&["openai", "gemini"]);
        first.set_provider("gemini").expect("known");
        assert_eq!(second.active_name(), Some("openai"));
    }
}
