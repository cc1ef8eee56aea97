use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AlertEventId, ProbeId, RuleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

/// An alert event, per spec.md §3. Identified in memory by the composite
/// key `(rule_id, probe_id)`; `id` is the durable row identity used for
/// upsert (firing -> resolved transitions reuse the same id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: AlertEventId,
    pub rule_id: RuleId,
    pub rule_name: String,
    pub probe_id: ProbeId,
    pub status: AlertStatus,
    pub message: String,
    pub fired_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Composite de-duplication key per spec.md §3's "at most one firing event
/// per `(rule_id, probe_id)`" invariant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlertKey {
    pub rule_id: RuleId,
    pub probe_id: ProbeId,
}

impl AlertKey {
    #[must_use]
    pub fn new(rule_id: RuleId, probe_id: ProbeId) -> Self {
        Self { rule_id, probe_id }
    }
}

impl AlertEvent {
    /// Upper-cased status word used to compose delivery summaries, per
    /// spec.md §4.2's `"[<STATUS-UPPER>] <message>"`.
    #[must_use]
    pub fn status_upper(&self) -> &'static str {
        match self.status {
            AlertStatus::Firing => "FIRING",
            AlertStatus::Resolved => "RESOLVED",
        }
    }

    #[must_use]
    pub fn key(&self) -> AlertKey {
        AlertKey::new(self.rule_id.clone(), self.probe_id.clone())
    }

    #[must_use]
    pub fn fire(rule_id: RuleId, rule_name: String, probe_id: ProbeId, message: String) -> Self {
        Self {
            id: AlertEventId::new(),
            rule_id,
            rule_name,
            probe_id,
            status: AlertStatus::Firing,
            message,
            fired_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Transition a firing event into a resolved one, reusing the same `id`
    /// so the store's upsert semantics produce a single row per spec.md §4.2
    /// step 4.
    #[must_use]
    pub fn resolved(mut self, now: DateTime<Utc>) -> Self {
        self.status = AlertStatus::Resolved;
        self.message = format!("Alert resolved for probe {}", self.probe_id);
        self.resolved_at = Some(now);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_reuses_id_and_sets_message() {
        let fired = AlertEvent::fire(
            RuleId::from("r1"),
            "High disk".into(),
            ProbeId::from("p1"),
            "disk at 95%".into(),
        );
        let id = fired.id.clone();
        let now = Utc::now();
        let resolved = fired.resolved(now);
        assert_eq!(resolved.id, id);
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert_eq!(resolved.resolved_at, Some(now));
        assert!(resolved.message.contains("p1"));
    }

    #[test]
    fn key_identifies_rule_probe_pair() {
        let a = AlertEvent::fire(
            RuleId::from("r1"),
            "n".into(),
            ProbeId::from("p1"),
            "m".into(),
        );
        let b = AlertEvent::fire(
            RuleId::from("r1"),
            "n".into(),
            ProbeId::from("p1"),
            "different message".into(),
        );
        assert_eq!(a.key(), b.key());
    }
}
