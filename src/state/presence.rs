//! Derived player liveness.
//!
//! Connectivity is never stored as ground truth: a player counts as connected
//! iff their last action is more recent than the configured threshold.

use std::time::Duration;

use time::OffsetDateTime;

/// Liveness policy shared by the registry, processor, and snapshot layer.
#[derive(Debug, Clone, Copy)]
pub struct PresencePolicy {
    threshold: Duration,
}

impl PresencePolicy {
    /// Build a policy with the given activity threshold.
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// Whether a player with the given `last_active` timestamp counts as
    /// connected at `now`.
    pub fn is_connected(&self, last_active: OffsetDateTime, now: OffsetDateTime) -> bool {
        now - last_active < self.threshold
    }
}

impl Default for PresencePolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_activity_counts_as_connected() {
        let policy = PresencePolicy::new(Duration::from_secs(600));
        let now = OffsetDateTime::now_utc();
        assert!(policy.is_connected(now - time::Duration::seconds(30), now));
    }

    #[test]
    fn stale_activity_counts_as_disconnected() {
        let policy = PresencePolicy::new(Duration::from_secs(600));
        let now = OffsetDateTime::now_utc();
        assert!(!policy.is_connected(now - time::Duration::seconds(601), now));
    }

    #[test]
    fn future_timestamps_stay_connected() {
        let policy = PresencePolicy::default();
        let now = OffsetDateTime::now_utc();
        assert!(policy.is_connected(now + time::Duration::seconds(5), now));
    }
}
