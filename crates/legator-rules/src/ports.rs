//! Narrow collaborator interfaces the engine depends on, per spec.md §9's
//! "cyclic references... avoided by dependency injection of narrow
//! interfaces (`Notifier.Notify/List`, `RoutingStore.Resolve`); the engine
//! owns neither."

use legator_core::{ProbeSnapshot, ProbeId, WebhookId};

/// Read-only view of the fleet snapshot the engine evaluates each pass.
pub trait FleetSnapshotProvider: Send + Sync {
    fn snapshot(&self) -> Vec<ProbeSnapshot>;
}

/// The subset of `WebhookNotifier`'s contract the engine needs to deliver
/// alerts, per spec.md §4.2's `deliver`.
pub trait NotifierPort: Send + Sync {
    fn known_webhook_ids(&self) -> Vec<WebhookId>;
    fn notify(&self, event_type: &str, probe_id: ProbeId, summary: String, detail: serde_json::Value);
}

impl NotifierPort for legator_notifier::WebhookNotifier {
    fn known_webhook_ids(&self) -> Vec<WebhookId> {
        self.list().into_iter().map(|cfg| cfg.id).collect()
    }

    fn notify(&self, event_type: &str, probe_id: ProbeId, summary: String, detail: serde_json::Value) {
        self.notify(event_type, probe_id, summary, detail);
    }
}
