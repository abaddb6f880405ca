//! HTTP API for running courses

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::collaborators::Collaborators;
use crate::config::TeachingConfig;
use crate::db::Database;
use crate::llm::ModelRegistry;
use crate::runtime::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub llm_registry: Arc<ModelRegistry>,
}

impl AppState {
    pub fn new(
        db: Database,
        collaborators: Arc<dyn Collaborators>,
        config: TeachingConfig,
        llm_registry: Arc<ModelRegistry>,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(db, collaborators, config)),
            llm_registry,
        }
    }
}
