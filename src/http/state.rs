use crate::config::Config;
use crate::pipeline::{HttpLanguageServices, LanguageServices};
use crate::stream::TranslationSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active translation sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<TranslationSession>>>>,
    pub config: Arc<Config>,
    pub services: Arc<dyn LanguageServices>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let services: Arc<dyn LanguageServices> =
            Arc::new(HttpLanguageServices::new(config.endpoints.clone()));
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config),
            services,
        }
    }
}
