use std::sync::Arc;

use pagesync_core::access::RolePolicy;
use pagesync_core::lifecycle::PageLifecycle;
use pagesync_core::root_props::RootPropsTranslator;
use pagesync_core::store::DocumentStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool. `None` when running on the in-memory store.
    pub pool: Option<pagesync_db::DbPool>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Page operations for the configured collection.
    pub pages: PageLifecycle,
}

impl AppState {
    /// Wire the page lifecycle for `store` using the collection and publish
    /// roles from `config`.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn DocumentStore>,
        pool: Option<pagesync_db::DbPool>,
    ) -> Self {
        let policy = RolePolicy::with_publish_roles(config.publish_roles.clone());
        let pages = PageLifecycle::new(
            store,
            Arc::new(policy),
            RootPropsTranslator::default(),
            config.pages_collection.clone(),
        );
        Self {
            pool,
            config: Arc::new(config),
            pages,
        }
    }
}
