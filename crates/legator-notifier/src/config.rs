use std::time::Duration;

/// Tunables for the notifier, per spec.md §4.4 and §0.3 — none of these are
/// hardcoded magic numbers inside the delivery path itself.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub request_timeout: Duration,
    pub history_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            history_capacity: 100,
        }
    }
}
