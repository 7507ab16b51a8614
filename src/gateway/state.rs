use std::time::Instant;

use crate::services::Services;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Process start, for uptime in health responses
    pub started_at: Instant,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            started_at: Instant::now(),
        }
    }
}
