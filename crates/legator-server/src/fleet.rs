//! The "external fleet collaborator" spec.md §3 describes: a read-mostly
//! map of the latest snapshot per probe, updated from `register`,
//! `heartbeat`, and `inventory` envelopes arriving over `/ws/probe`, and
//! read by `legator_rules::AlertEngine` once per evaluation pass via
//! `FleetSnapshotProvider`. Kept intentionally thin, per SPEC_FULL.md §10.

use chrono::Utc;
use dashmap::DashMap;
use legator_core::{
    HeartbeatPayload, Inventory, ProbeId, ProbeSnapshot, ProbeStatus, RegisterPayload,
};
use legator_rules::FleetSnapshotProvider;

/// In-memory fleet view, one entry per probe that has ever registered.
#[derive(Default)]
pub struct FleetRegistry {
    probes: DashMap<ProbeId, ProbeSnapshot>,
}

impl FleetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a `register` envelope: creates or replaces the snapshot,
    /// marking the probe online.
    pub fn register(&self, payload: RegisterPayload) {
        let id = ProbeId::from(payload.probe_id);
        self.probes.insert(
            id.clone(),
            ProbeSnapshot {
                id,
                status: ProbeStatus::Online,
                last_seen: Utc::now(),
                tags: payload.tags,
                inventory: payload.inventory,
                last_heartbeat: None,
            },
        );
    }

    /// Apply a `heartbeat` envelope, refreshing `last_seen` and the sample.
    /// A probe that heartbeats without having registered first still gets
    /// an entry, so a reconnect after a server restart isn't silently lost.
    pub fn heartbeat(&self, payload: HeartbeatPayload) {
        let id = ProbeId::from(payload.probe_id);
        self.probes
            .entry(id.clone())
            .and_modify(|snap| {
                snap.status = ProbeStatus::Online;
                snap.last_seen = Utc::now();
                if payload.sample.is_some() {
                    snap.last_heartbeat = payload.sample.clone();
                }
            })
            .or_insert_with(|| ProbeSnapshot {
                id,
                status: ProbeStatus::Online,
                last_seen: Utc::now(),
                tags: Vec::new(),
                inventory: None,
                last_heartbeat: payload.sample,
            });
    }

    /// Apply an `inventory` envelope reported on request or at registration.
    pub fn update_inventory(&self, probe_id: &ProbeId, inventory: Inventory) {
        if let Some(mut snap) = self.probes.get_mut(probe_id) {
            snap.inventory = Some(inventory);
        }
    }

    /// Mark a probe offline when its WebSocket connection drops.
    pub fn mark_offline(&self, probe_id: &ProbeId) {
        if let Some(mut snap) = self.probes.get_mut(probe_id) {
            snap.status = ProbeStatus::Offline;
        }
    }

    #[must_use]
    pub fn get(&self, probe_id: &ProbeId) -> Option<ProbeSnapshot> {
        self.probes.get(probe_id).map(|e| e.value().clone())
    }
}

impl FleetSnapshotProvider for FleetRegistry {
    fn snapshot(&self) -> Vec<ProbeSnapshot> {
        self.probes.iter().map(|e| e.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(id: &str) -> RegisterPayload {
        RegisterPayload {
            probe_id: id.to_owned(),
            tags: vec!["prod".into()],
            inventory: None,
        }
    }

    #[test]
    fn register_then_snapshot_reports_online() {
        let fleet = FleetRegistry::new();
        fleet.register(register("p1"));
        let snap = fleet.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].status, ProbeStatus::Online);
        assert_eq!(snap[0].tags, vec!["prod".to_owned()]);
    }

    #[test]
    fn heartbeat_without_register_still_creates_entry() {
        let fleet = FleetRegistry::new();
        fleet.heartbeat(HeartbeatPayload {
            probe_id: "p2".into(),
            sample: None,
        });
        assert!(fleet.get(&ProbeId::from("p2")).is_some());
    }

    #[test]
    fn mark_offline_flips_status() {
        let fleet = FleetRegistry::new();
        fleet.register(register("p1"));
        fleet.mark_offline(&ProbeId::from("p1"));
        assert_eq!(fleet.get(&ProbeId::from("p1")).unwrap().status, ProbeStatus::Offline);
    }

    #[test]
    fn mark_offline_on_unknown_probe_is_a_no_op() {
        let fleet = FleetRegistry::new();
        fleet.mark_offline(&ProbeId::from("ghost"));
        assert!(fleet.get(&ProbeId::from("ghost")).is_none());
    }
}
