use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::AlertEvent;
use crate::ids::ProbeId;

/// Payload the Alert Engine hands to the Webhook Notifier, per spec.md
/// §4.4's `Notify(event_type, probe_id, summary, detail)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub event_type: String,
    pub probe_id: ProbeId,
    pub summary: String,
    pub detail: serde_json::Value,
}

impl NotificationPayload {
    #[must_use]
    pub fn for_alert(event_type: &str, event: &AlertEvent) -> Self {
        let summary = format!(
            "[{}] {}",
            event.status_upper(),
            event.message
        );
        Self {
            event_type: event_type.to_owned(),
            probe_id: event.probe_id.clone(),
            summary,
            detail: serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Event published on the bus, per spec.md §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub probe_id: Option<ProbeId>,
    pub summary: String,
    pub detail: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl BusEvent {
    #[must_use]
    pub fn probe_disconnected(probe_id: ProbeId) -> Self {
        Self {
            event_type: "probe.disconnected".to_owned(),
            summary: format!("probe {probe_id} disconnected"),
            probe_id: Some(probe_id),
            detail: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn from_notification(payload: &NotificationPayload) -> Self {
        Self {
            event_type: payload.event_type.clone(),
            probe_id: Some(payload.probe_id.clone()),
            summary: payload.summary.clone(),
            detail: payload.detail.clone(),
            timestamp: Utc::now(),
        }
    }
}
