//! Application state for the API server.

use mentor_orchestrator::Orchestrator;

/// Shared state: the fully wired orchestrator plus server bookkeeping.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
