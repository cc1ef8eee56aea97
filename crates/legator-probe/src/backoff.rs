use std::time::Duration;

use rand::Rng;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(5 * 60);
const AUTH_REJECTION_FLOOR: Duration = Duration::from_secs(30);

/// Tracks the reconnect loop's exponential-backoff sequence, per spec.md
/// §4.1. Shaped like `acteon-executor::RetryStrategy::delay_for`'s
/// exponential-with-jitter curve, but open-ended (no `max_attempts`) and
/// with a second, non-growing floor for credential rejections that must
/// not race the transient sequence.
pub struct ReconnectState {
    next: Duration,
}

impl ReconnectState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: INITIAL_BACKOFF,
        }
    }

    /// Called after a successful handshake so the next disconnect starts
    /// the sequence over at 1 s.
    pub fn reset(&mut self) {
        self.next = INITIAL_BACKOFF;
    }

    /// Consumes the current base delay, jitters it, and doubles the
    /// sequence (capped at 5 min) for the following call.
    pub fn next_transient_delay(&mut self) -> Duration {
        let base = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        jittered(base)
    }

    /// Fixed 30 s floor for 401/403 handshake rejections. Does not grow on
    /// repeat and leaves the transient sequence untouched.
    #[must_use]
    pub fn auth_rejection_delay(&self) -> Duration {
        jittered(AUTH_REJECTION_FLOOR)
    }
}

impl Default for ReconnectState {
    fn default() -> Self {
        Self::new()
    }
}

fn jittered(base: Duration) -> Duration {
    let fraction: f64 = rand::thread_rng().gen_range(0.0..0.5);
    base.mul_f64(1.0 + fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_in_jitter_range(delay: Duration, base: Duration) {
        let upper = base.mul_f64(1.5) + Duration::from_millis(1);
        assert!(delay >= base, "{delay:?} should be >= {base:?}");
        assert!(delay < upper, "{delay:?} should be < {upper:?}");
    }

    #[test]
    fn doubles_each_attempt() {
        let mut state = ReconnectState::new();
        for secs in [1, 2, 4, 8, 16] {
            assert_in_jitter_range(state.next_transient_delay(), Duration::from_secs(secs));
        }
    }

    #[test]
    fn caps_at_five_minutes() {
        let mut state = ReconnectState::new();
        for _ in 0..20 {
            state.next_transient_delay();
        }
        assert_in_jitter_range(state.next_transient_delay(), MAX_BACKOFF);
    }

    #[test]
    fn reset_returns_to_initial_backoff() {
        let mut state = ReconnectState::new();
        state.next_transient_delay();
        state.next_transient_delay();
        state.reset();
        assert_in_jitter_range(state.next_transient_delay(), INITIAL_BACKOFF);
    }

    #[test]
    fn auth_rejection_floor_does_not_grow_or_touch_transient_sequence() {
        let mut state = ReconnectState::new();
        assert_in_jitter_range(state.auth_rejection_delay(), AUTH_REJECTION_FLOOR);
        assert_in_jitter_range(state.auth_rejection_delay(), AUTH_REJECTION_FLOOR);
        assert_in_jitter_range(state.next_transient_delay(), INITIAL_BACKOFF);
    }
}
