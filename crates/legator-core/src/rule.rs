use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RuleId, WebhookId};

/// A condition a rule evaluates against a probe, per spec.md §3.
///
/// Durations are textual (`"2m"`, `"500ms"`, `"0s"`); `tags` is the optional
/// filter a rule applies before evaluating its condition against a probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    ProbeOffline {
        #[serde(default)]
        duration: String,
        #[serde(default)]
        tags: Vec<String>,
    },
    DiskThreshold {
        threshold_pct: f64,
        #[serde(default)]
        duration: String,
        #[serde(default)]
        tags: Vec<String>,
    },
    CpuThreshold {
        threshold_pct: f64,
        #[serde(default)]
        duration: String,
        #[serde(default)]
        tags: Vec<String>,
    },
}

impl Condition {
    /// Short machine name used in routing context / log fields.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ProbeOffline { .. } => "probe_offline",
            Self::DiskThreshold { .. } => "disk_threshold",
            Self::CpuThreshold { .. } => "cpu_threshold",
        }
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        match self {
            Self::ProbeOffline { tags, .. }
            | Self::DiskThreshold { tags, .. }
            | Self::CpuThreshold { tags, .. } => tags,
        }
    }

    #[must_use]
    pub fn duration_str(&self) -> &str {
        match self {
            Self::ProbeOffline { duration, .. }
            | Self::DiskThreshold { duration, .. }
            | Self::CpuThreshold { duration, .. } => duration,
        }
    }

    /// Whether this condition type uses the pending-timer sustained-duration
    /// phase, per spec.md §4.2 step 3.b (`probe_offline` embeds its own
    /// duration check and never uses a pending timer).
    #[must_use]
    pub fn is_sustained(&self) -> bool {
        !matches!(self, Self::ProbeOffline { .. })
    }
}

/// An action a firing/resolved event triggers. Currently only `webhook` per
/// spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    Webhook { webhook_id: WebhookId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// An alert rule, per spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: RuleId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub enabled: bool,
    pub condition: Condition,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
    pub severity: Option<Severity>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertRule {
    /// Webhook ids named by this rule's actions, used by the engine's
    /// delivery filter (spec.md §4.2 "deliver").
    pub fn webhook_ids(&self) -> impl Iterator<Item = &WebhookId> {
        self.actions.iter().map(|RuleAction::Webhook { webhook_id }| webhook_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_type_name() {
        let c = Condition::ProbeOffline {
            duration: "2m".into(),
            tags: vec![],
        };
        assert_eq!(c.type_name(), "probe_offline");
        assert!(!c.is_sustained());
    }

    #[test]
    fn disk_threshold_is_sustained() {
        let c = Condition::DiskThreshold {
            threshold_pct: 80.0,
            duration: "1m".into(),
            tags: vec![],
        };
        assert!(c.is_sustained());
    }

    #[test]
    fn condition_serde_tag() {
        let c = Condition::CpuThreshold {
            threshold_pct: 90.0,
            duration: "".into(),
            tags: vec![],
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "cpu_threshold");
    }
}
