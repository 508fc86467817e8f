//! Shared application state for Axum routers.

use std::time::Instant;

use kanban_ledger::KanbanService;
use kanban_storage::LedgerStore;

/// Application-wide state shared across all routes.
///
/// Generic over the store so the same routers serve PostgreSQL in
/// production and the in-memory store in tests.
pub struct AppState<S: LedgerStore> {
    pub service: KanbanService<S>,
    pub start_time: Instant,
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(service: KanbanService<S>) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }
}

// Derive would demand `S: Clone`; only the service handle is cloned.
impl<S: LedgerStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            start_time: self.start_time,
        }
    }
}
