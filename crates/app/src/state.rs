//! Shared application state for the HTTP server.

use std::sync::Arc;

use services::SessionController;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
}

impl AppState {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self { controller }
    }
}
