use std::sync::Arc;

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable document store. Postgres in production, in-memory for tests.
    pub store: Arc<dyn DocumentStore>,
    pub tokens: TokenKeys,
    pub config: Config,
}

impl AppState {
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }
}
