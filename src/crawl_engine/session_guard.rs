//! Bounded-lifetime session tracking for a live layer instance

use tokio::time::Instant;

use crate::config::LayerProfile;

/// Age and use count of the current session of one layer
#[derive(Debug, Clone, Default)]
pub struct SessionGuard {
    started_at: Option<Instant>,
    requests: u32,
}

impl SessionGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a fresh session as started now
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.requests = 0;
    }

    /// Forget the session (layer cleaned up)
    pub fn reset(&mut self) {
        self.started_at = None;
        self.requests = 0;
    }

    pub fn record_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    #[must_use]
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    #[must_use]
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// True once the session outlived `max_session_duration` or used up its
    /// request cap. A session that never started is never recycled.
    #[must_use]
    pub fn should_recycle(&self, profile: &LayerProfile) -> bool {
        let Some(started) = self.started_at else {
            return false;
        };

        if started.elapsed() > profile.max_session_duration {
            return true;
        }

        profile
            .max_requests_per_session
            .is_some_and(|cap| self.requests >= cap)
    }
}
