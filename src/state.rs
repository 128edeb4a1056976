use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::Store;

/// Shared application state: the injected store handle and configuration.
/// Constructed once at startup and cloned into every router.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        Self { store, config: Arc::new(config) }
    }
}
