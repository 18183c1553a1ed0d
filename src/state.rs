// Shared application state handed to every handler.

use std::sync::Arc;

use crate::analysis::Extractor;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub extractor: Extractor,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            extractor: Extractor::new(config.excerpt_chars),
            config: Arc::new(config),
        }
    }
}
