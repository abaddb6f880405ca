//! Model definitions
//!
//! Every model the collaborators can be pointed at lives here.

use super::{AnthropicService, LlmError, LlmService};
use std::sync::Arc;

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "claude-4.5-opus")
    pub id: &'static str,
    /// API name sent to the provider (e.g., "claude-opus-4-5-20251101")
    pub api_name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Context window size in tokens
    pub context_window: usize,
}

impl ModelDef {
    /// Build the service for this model.
    pub fn create(
        &self,
        api_key: &str,
        base_url: Option<&str>,
    ) -> Result<Arc<dyn LlmService>, LlmError> {
        if api_key.is_empty() {
            return Err(LlmError::auth(format!(
                "{} requires ANTHROPIC_API_KEY",
                self.id
            )));
        }
        Ok(Arc::new(AnthropicService::new(api_key, self, base_url)?))
    }
}

static MODELS: &[ModelDef] = &[
    ModelDef {
        id: "claude-4.5-haiku",
        api_name: "claude-haiku-4-5-20251001",
        description: "Claude Haiku 4.5 (fast, efficient)",
        context_window: 200_000,
    },
    ModelDef {
        id: "claude-4.5-sonnet",
        api_name: "claude-sonnet-4-5-20250929",
        description: "Claude Sonnet 4.5 (balanced performance)",
        context_window: 200_000,
    },
    ModelDef {
        id: "claude-4.5-opus",
        api_name: "claude-opus-4-5-20251101",
        description: "Claude Opus 4.5 (most capable, slower)",
        context_window: 200_000,
    },
];

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    MODELS
}

pub fn find_model(id: &str) -> Option<&'static ModelDef> {
    MODELS.iter().find(|m| m.id == id)
}
