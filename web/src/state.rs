//! Application state for Axum handlers.

use rsvp_core::{Clock, EntityStore};
use rsvp_runtime::{QueryResolver, RsvpService, ServiceConfig};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Writes go through `service`, reads through `queries`. Both wrap the same
/// store, which `/ready` pings directly.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Domain service (mutations)
    pub service: RsvpService,
    /// Query resolver (reads with derived fields)
    pub queries: QueryResolver,
}

impl AppState {
    /// Build the state over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>, config: ServiceConfig) -> Self {
        Self {
            queries: QueryResolver::new(Arc::clone(&store), Arc::clone(&clock)),
            service: RsvpService::new(store, clock).with_config(config),
        }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn EntityStore> {
        self.service.store()
    }
}
