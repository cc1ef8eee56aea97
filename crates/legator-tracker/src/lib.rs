//! Correlates outbound commands with their asynchronous results, per
//! spec.md §4.5. Grounded on `acteon-executor::dlq::DeadLetterQueue`'s
//! single-mutex, never-held-across-`.await` discipline, and on
//! `acteon-gateway::background`'s ticker-driven reaper idiom.

pub mod error;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use legator_core::{CommandResultPayload, ProbeId, RequestId};
use tokio::sync::oneshot;
use tracing::{info, instrument, warn};

pub use error::TrackerError;

const DEFAULT_TTL: Duration = Duration::from_secs(120);
const REAP_INTERVAL: Duration = Duration::from_secs(10);

/// A command awaiting its probe-side result, per spec.md §3's Pending
/// Command record.
struct PendingEntry {
    probe_id: ProbeId,
    command: String,
    capability_level: String,
    submitted_at: DateTime<Utc>,
    sender: oneshot::Sender<CommandResultPayload>,
}

/// Diagnostic view of a pending command, returned by `list_pending`.
#[derive(Debug, Clone)]
pub struct PendingCommandInfo {
    pub request_id: RequestId,
    pub probe_id: ProbeId,
    pub command: String,
    pub submitted_at: DateTime<Utc>,
}

/// The waiter's side of a tracked command: a one-shot receiver that
/// eventually yields exactly one of a real result, a synthetic timeout
/// result, or nothing (on cancellation, per spec.md §3's "cancellation
/// close" outcome).
pub struct TrackedCommand {
    pub request_id: RequestId,
    pub receiver: oneshot::Receiver<CommandResultPayload>,
}

pub struct CommandTracker {
    ttl: Duration,
    pending: Mutex<HashMap<RequestId, PendingEntry>>,
}

impl CommandTracker {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    #[instrument(skip(self, command))]
    pub fn track(
        &self,
        request_id: RequestId,
        probe_id: ProbeId,
        command: String,
        capability_level: String,
    ) -> TrackedCommand {
        let (sender, receiver) = oneshot::channel();
        let entry = PendingEntry {
            probe_id,
            command,
            capability_level,
            submitted_at: Utc::now(),
            sender,
        };
        self.pending
            .lock()
            .expect("tracker mutex poisoned")
            .insert(request_id.clone(), entry);
        TrackedCommand {
            request_id,
            receiver,
        }
    }

    /// Deliver `result` to the waiter and remove the entry. Fails with
    /// `UnknownRequest` if the request already expired or was cancelled.
    pub fn complete(
        &self,
        request_id: &RequestId,
        result: CommandResultPayload,
    ) -> Result<(), TrackerError> {
        let entry = self
            .pending
            .lock()
            .expect("tracker mutex poisoned")
            .remove(request_id)
            .ok_or_else(|| TrackerError::UnknownRequest(request_id.clone()))?;
        // A dropped receiver (caller gave up) is not an error here — the
        // entry is still correctly removed.
        let _ = entry.sender.send(result);
        Ok(())
    }

    /// Remove without delivering a result; dropping the sender closes the
    /// channel so a waiting caller observes the closed signal.
    pub fn cancel(&self, request_id: &RequestId) {
        self.pending.lock().expect("tracker mutex poisoned").remove(request_id);
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.lock().expect("tracker mutex poisoned").len()
    }

    #[must_use]
    pub fn list_pending(&self) -> Vec<PendingCommandInfo> {
        self.pending
            .lock()
            .expect("tracker mutex poisoned")
            .iter()
            .map(|(id, entry)| PendingCommandInfo {
                request_id: id.clone(),
                probe_id: entry.probe_id.clone(),
                command: entry.command.clone(),
                submitted_at: entry.submitted_at,
            })
            .collect()
    }

    /// One pass of the TTL reaper: deliver a synthetic timeout result to
    /// every entry whose `submitted_at` has aged past `ttl`, then remove it.
    /// Exposed directly (rather than only via `run_reaper`) so tests can
    /// drive it deterministically without waiting on the real ticker.
    pub fn reap_expired(&self) {
        let now = Utc::now();
        let ttl = self.ttl;
        let mut pending = self.pending.lock().expect("tracker mutex poisoned");
        let expired: Vec<RequestId> = pending
            .iter()
            .filter(|(_, entry)| now.signed_duration_since(entry.submitted_at) >= chrono_ttl(ttl))
            .map(|(id, _)| id.clone())
            .collect();

        for request_id in expired {
            if let Some(entry) = pending.remove(&request_id) {
                warn!(%request_id, "command timed out waiting for probe response");
                let synthetic = CommandResultPayload {
                    request_id: request_id.to_string(),
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: "command timed out waiting for probe response".to_owned(),
                    duration_ms: ttl.as_millis() as u64,
                };
                let _ = entry.sender.send(synthetic);
            }
        }
    }

    /// Run the reaper loop forever (every 10 s per spec.md §4.5) until
    /// cancelled.
    pub async fn run_reaper(&self, mut cancellation: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(REAP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.reap_expired();
                }
                _ = cancellation.changed() => {
                    info!("tracker reaper shutting down");
                    return;
                }
            }
        }
    }
}

impl Default for CommandTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

fn chrono_ttl(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_then_complete_delivers_result() {
        let tracker = CommandTracker::new(Duration::from_secs(60));
        let mut tracked = tracker.track(
            RequestId::from("req-1"),
            ProbeId::from("p1"),
            "ls".into(),
            "admin".into(),
        );
        tracker
            .complete(
                &RequestId::from("req-1"),
                CommandResultPayload {
                    request_id: "req-1".into(),
                    exit_code: 0,
                    stdout: "ok".into(),
                    stderr: String::new(),
                    duration_ms: 5,
                },
            )
            .unwrap();
        let result = tracked.receiver.try_recv().unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn complete_unknown_request_is_an_error() {
        let tracker = CommandTracker::new(Duration::from_secs(60));
        let err = tracker
            .complete(
                &RequestId::from("missing"),
                CommandResultPayload {
                    request_id: "missing".into(),
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration_ms: 0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, TrackerError::UnknownRequest(_)));
    }

    #[test]
    fn cancel_closes_the_slot_without_delivering() {
        let tracker = CommandTracker::new(Duration::from_secs(60));
        let mut tracked = tracker.track(
            RequestId::from("req-1"),
            ProbeId::from("p1"),
            "ls".into(),
            "admin".into(),
        );
        tracker.cancel(&RequestId::from("req-1"));
        assert_eq!(tracker.in_flight(), 0);
        assert!(tracked.receiver.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reap_expired_delivers_synthetic_timeout() {
        let tracker = CommandTracker::new(Duration::from_millis(50));
        let tracked = tracker.track(
            RequestId::from("req-1"),
            ProbeId::from("p1"),
            "ls".into(),
            "admin".into(),
        );
        tokio::time::advance(Duration::from_millis(60)).await;
        tracker.reap_expired();

        let result = tracked.receiver.await.unwrap();
        assert_eq!(result.exit_code, -1);
        assert!(!result.stderr.is_empty());
        assert_eq!(result.duration_ms, 50);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn list_pending_reflects_tracked_commands() {
        let tracker = CommandTracker::new(Duration::from_secs(60));
        let _ = tracker.track(
            RequestId::from("req-1"),
            ProbeId::from("p1"),
            "ls".into(),
            "admin".into(),
        );
        let pending = tracker.list_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].command, "ls");
    }
}
