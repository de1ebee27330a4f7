//! HTTP API for the chat session

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::runtime::ProductionSession;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ProductionSession>,
}

impl AppState {
    pub fn new(session: ProductionSession) -> Self {
        Self {
            session: Arc::new(session),
        }
    }
}
