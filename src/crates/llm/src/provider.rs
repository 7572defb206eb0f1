//! Provider credential registry and client construction.
//!
//! Providers are looked up by the `provider` field of a [`ModelConfig`].
//! Credentials come from the environment on first use: `<PROVIDER>_API_KEY`
//! and `<PROVIDER>_BASE_URL` (provider name uppercased). Tests and embedders
//! can also [`register`](ProviderManager::register) providers directly.

use crate::client::ChatModel;
use crate::config::ModelConfig;
use crate::error::{LlmError, Result};
use crate::remote::OpenAiCompatClient;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Connection settings for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider name (e.g. `doubao`, `openai`, `deepseek`).
    pub name: String,

    /// API key sent as a bearer token.
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API, without a trailing slash.
    pub base_url: String,
}

/// Registry of provider configurations.
#[derive(Default)]
pub struct ProviderManager {
    providers: RwLock<HashMap<String, ProviderConfig>>,
}

impl ProviderManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider explicitly, replacing any existing entry.
    pub fn register(&self, config: ProviderConfig) {
        self.providers.write().insert(config.name.clone(), config);
    }

    /// Look up a provider, falling back to environment variables
    /// `<NAME>_API_KEY` / `<NAME>_BASE_URL` and caching the result.
    pub fn get(&self, name: &str) -> Option<ProviderConfig> {
        if let Some(config) = self.providers.read().get(name) {
            return Some(config.clone());
        }

        let prefix = name.to_uppercase().replace('-', "_");
        let api_key = std::env::var(format!("{prefix}_API_KEY")).ok()?;
        let base_url = std::env::var(format!("{prefix}_BASE_URL")).ok()?;
        let config = ProviderConfig {
            name: name.to_string(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        };
        self.providers
            .write()
            .insert(name.to_string(), config.clone());
        tracing::info!(provider = name, "Loaded provider credentials from environment");
        Some(config)
    }

    /// Names of all registered providers.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.read().keys().cloned().collect()
    }
}

/// Build a [`ChatModel`] for a validated node model configuration.
pub fn build_chat_model(
    config: &ModelConfig,
    providers: &ProviderManager,
) -> Result<Arc<dyn ChatModel>> {
    config.validate()?;

    let provider = providers
        .get(&config.provider)
        .ok_or_else(|| LlmError::UnknownProvider(config.provider.clone()))?;

    Ok(Arc::new(OpenAiCompatClient::new(provider, config.clone())?))
}

/// Construction seam for chat models.
///
/// Graph builders depend on this trait rather than on concrete clients, so
/// tests can swap in scripted models while production wires
/// [`ProviderChatModelFactory`].
pub trait ChatModelFactory: Send + Sync {
    /// Build a model for one node configuration.
    fn build_model(&self, config: &ModelConfig) -> Result<Arc<dyn ChatModel>>;
}

/// The production [`ChatModelFactory`]: resolves credentials through a
/// [`ProviderManager`] and builds [`OpenAiCompatClient`]s.
pub struct ProviderChatModelFactory {
    providers: Arc<ProviderManager>,
}

impl ProviderChatModelFactory {
    /// Create a factory over the given provider registry.
    pub fn new(providers: Arc<ProviderManager>) -> Self {
        Self { providers }
    }
}

impl ChatModelFactory for ProviderChatModelFactory {
    fn build_model(&self, config: &ModelConfig) -> Result<Arc<dyn ChatModel>> {
        build_chat_model(config, &self.providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_provider_is_returned() {
        let manager = ProviderManager::new();
        manager.register(ProviderConfig {
            name: "test".to_string(),
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:9999/v1".to_string(),
        });

        let config = manager.get("test").unwrap();
        assert_eq!(config.base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn unknown_provider_without_env_is_none() {
        let manager = ProviderManager::new();
        assert!(manager.get("definitely-not-configured").is_none());
    }

    #[test]
    fn build_chat_model_requires_known_provider() {
        let manager = ProviderManager::new();
        let config = ModelConfig {
            provider: "ghost".to_string(),
            name: "model".to_string(),
            temperature: 0.7,
            thinking: None,
            reasoning_effort: None,
            timeout: None,
        };
        assert!(matches!(
            build_chat_model(&config, &manager),
            Err(LlmError::UnknownProvider(_))
        ));
    }
}
