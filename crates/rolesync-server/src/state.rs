use std::sync::Arc;

use rolesync_core::SyncService;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncService>,
    pub webhook_secret: Arc<str>,
}

impl AppState {
    pub fn new(sync: Arc<SyncService>, webhook_secret: impl Into<Arc<str>>) -> Self {
        Self {
            sync,
            webhook_secret: webhook_secret.into(),
        }
    }
}
