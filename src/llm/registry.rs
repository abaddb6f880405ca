//! Model registry for managing available LLM services

use super::{all_models, LlmService, LoggingService};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration for the LLM provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    /// Alternate API root (e.g. a proxy), without the `/v1/messages` suffix
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            base_url: std::env::var("ANTHROPIC_BASE_URL").ok(),
        }
    }
}

/// Registry of available LLM models
#[derive(Default)]
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
}

impl ModelRegistry {
    /// Create an empty registry for testing purposes
    #[cfg(test)]
    pub fn new_empty() -> Self {
        Self::default()
    }

    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        let Some(api_key) = config.anthropic_api_key.as_deref().filter(|k| !k.is_empty()) else {
            tracing::warn!("ANTHROPIC_API_KEY not set, no models available");
            return Self { services };
        };

        for model_def in all_models() {
            match model_def.create(api_key, config.base_url.as_deref()) {
                Ok(service) => {
                    services.insert(
                        model_def.id.to_string(),
                        Arc::new(LoggingService::new(service)),
                    );
                }
                Err(e) => {
                    tracing::warn!(model = model_def.id, error = %e, "Failed to create model");
                }
            }
        }

        Self { services }
    }

    /// Register a service under its own model ID
    #[cfg(test)]
    pub fn with_service(mut self, service: Arc<dyn LlmService>) -> Self {
        self.services.insert(service.model_id().to_string(), service);
        self
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Get detailed information about available models
    pub fn available_model_info(&self) -> Vec<crate::api::ModelInfo> {
        all_models()
            .iter()
            .filter(|def| self.services.contains_key(def.id))
            .map(|def| crate::api::ModelInfo {
                id: def.id.to_string(),
                description: def.description.to_string(),
                context_window: def.context_window,
            })
            .collect()
    }

    /// Check if any models are available
    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}
