use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use legator_core::{
    match_tags, parse_rule_duration, AlertEvent, AlertKey, AlertRule, BusEvent,
    NotificationPayload,
};
use legator_state::{AlertEventStore, RuleStore};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::condition::condition_met;
use crate::error::EngineError;
use crate::ports::{FleetSnapshotProvider, NotifierPort};

const DEFAULT_TICK: Duration = Duration::from_secs(30);

struct EngineState {
    firing: HashMap<AlertKey, AlertEvent>,
    pending: HashMap<AlertKey, DateTime<Utc>>,
}

struct RunningHandle {
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Transforms probe snapshots and rules into firing/resolved transitions,
/// per spec.md §4.2. Follows `acteon-rules::engine`'s *shape* — an async
/// evaluate entry point with structured tracing spans per rule — without
/// its general expression-IR evaluator, which this closed condition set
/// doesn't need.
pub struct AlertEngine {
    rules: Arc<dyn RuleStore>,
    events: Arc<dyn AlertEventStore>,
    fleet: Arc<dyn FleetSnapshotProvider>,
    notifier: Arc<dyn NotifierPort>,
    bus: Option<legator_bus::EventBus>,
    tick_interval: Duration,
    state: Mutex<EngineState>,
    running: std::sync::Mutex<Option<RunningHandle>>,
}

impl AlertEngine {
    /// Construct the engine, rehydrating the firing map from every
    /// persisted `status=firing` event (spec.md §4.2's startup rehydration).
    pub async fn new(
        rules: Arc<dyn RuleStore>,
        events: Arc<dyn AlertEventStore>,
        fleet: Arc<dyn FleetSnapshotProvider>,
        notifier: Arc<dyn NotifierPort>,
        bus: Option<legator_bus::EventBus>,
    ) -> Result<Self, EngineError> {
        let active = events.active_alerts().await?;
        let firing = active.into_iter().map(|e| (e.key(), e)).collect();
        Ok(Self {
            rules,
            events,
            fleet,
            notifier,
            bus,
            tick_interval: DEFAULT_TICK,
            state: Mutex::new(EngineState {
                firing,
                pending: HashMap::new(),
            }),
            running: std::sync::Mutex::new(None),
        })
    }

    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Idempotent: launches the 30 s ticker and, if a bus is attached, the
    /// `probe.disconnected` subscriber. A second call while already running
    /// is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut running = self.running.lock().expect("engine running-lock poisoned");
        if running.is_some() {
            return;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        let engine = Arc::clone(self);
        let join = tokio::spawn(run_loop(engine, stop_rx));
        *running = Some(RunningHandle { stop: stop_tx, join });
    }

    /// Idempotent: stopping an engine that isn't running is a no-op.
    pub async fn stop(&self) {
        let handle = self.running.lock().expect("engine running-lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.stop.send(true);
            let _ = handle.join.await;
        }
    }

    /// A sorted copy of currently firing events, stable by `(rule_id,
    /// probe_id)`, for diagnostics.
    pub async fn snapshot_firing(&self) -> Vec<AlertEvent> {
        let state = self.state.lock().await;
        let mut events: Vec<AlertEvent> = state.firing.values().cloned().collect();
        events.sort_by(|a, b| (&a.rule_id, &a.probe_id).cmp(&(&b.rule_id, &b.probe_id)));
        events
    }

    /// One full evaluation pass, serialized by the engine's evaluation
    /// mutex (`state`'s lock is held for the whole pass, matching spec.md
    /// §4.2's "a single evaluation mutex ensures only one pass runs at a
    /// time").
    #[instrument(skip(self))]
    pub async fn evaluate(&self) -> Result<(), EngineError> {
        let rules = self.rules.list_rules().await?;
        let probes = self.fleet.snapshot();
        let now = Utc::now();

        let enabled_by_id: HashMap<_, _> = rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| (r.id.clone(), r))
            .collect();
        let all_by_id: HashMap<_, _> = rules.iter().map(|r| (r.id.clone(), r)).collect();

        let mut state = self.state.lock().await;
        let mut matched: HashSet<AlertKey> = HashSet::new();

        for rule in enabled_by_id.values() {
            let duration = match parse_rule_duration(rule.condition.duration_str()) {
                Ok(d) => d,
                Err(e) => {
                    warn!(rule_id = %rule.id, error = %e, "skipping rule with invalid duration");
                    continue;
                }
            };

            for probe in probes
                .iter()
                .filter(|p| match_tags(&p.tags, rule.condition.tags()))
            {
                let key = AlertKey::new(rule.id.clone(), probe.id.clone());
                let (met, message) = condition_met(&rule.condition, probe, now, duration);

                if !met {
                    state.pending.remove(&key);
                    continue;
                }

                if rule.condition.is_sustained() && !duration.is_zero() {
                    match state.pending.get(&key) {
                        None => {
                            state.pending.insert(key.clone(), now);
                            continue;
                        }
                        Some(started) => {
                            let elapsed = now.signed_duration_since(*started);
                            let threshold =
                                chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
                            if elapsed < threshold {
                                continue;
                            }
                            state.pending.remove(&key);
                        }
                    }
                }

                matched.insert(key.clone());
                if state.firing.contains_key(&key) {
                    continue;
                }

                let event = AlertEvent::fire(rule.id.clone(), rule.name.clone(), probe.id.clone(), message);
                match self.events.upsert_event(event).await {
                    Ok(persisted) => {
                        state.firing.insert(key, persisted.clone());
                        self.deliver(Some(rule), &persisted, "AlertFired");
                    }
                    Err(e) => {
                        warn!(rule_id = %rule.id, probe_id = %probe.id, error = %e, "failed to persist firing event; will retry next pass");
                    }
                }
            }
        }

        let to_resolve: Vec<AlertKey> = state
            .firing
            .keys()
            .filter(|k| !matched.contains(k))
            .cloned()
            .collect();

        for key in to_resolve {
            let Some(firing_event) = state.firing.get(&key).cloned() else {
                continue;
            };
            let resolved = firing_event.resolved(now);
            match self.events.upsert_event(resolved).await {
                Ok(persisted) => {
                    state.firing.remove(&key);
                    state.pending.remove(&key);
                    let rule = all_by_id.get(&key.rule_id).copied();
                    self.deliver(rule, &persisted, "AlertResolved");
                }
                Err(e) => {
                    warn!(rule_id = %key.rule_id, probe_id = %key.probe_id, error = %e, "failed to persist resolution; will retry next pass");
                }
            }
        }

        state
            .pending
            .retain(|key, _| enabled_by_id.contains_key(&key.rule_id));

        Ok(())
    }

    fn deliver(&self, rule: Option<&AlertRule>, event: &AlertEvent, event_type: &str) {
        let payload = NotificationPayload::for_alert(event_type, event);

        if let Some(bus) = &self.bus {
            bus.publish(BusEvent::from_notification(&payload));
        }

        let should_notify = match rule {
            Some(r) if !r.actions.is_empty() => {
                let known: HashSet<_> = self.notifier.known_webhook_ids().into_iter().collect();
                r.webhook_ids().any(|id| known.contains(id))
            }
            _ => true,
        };

        if should_notify {
            self.notifier.notify(
                &payload.event_type,
                payload.probe_id.clone(),
                payload.summary.clone(),
                payload.detail.clone(),
            );
        } else {
            debug!(event_type, "no known webhook targets for rule; skipping delivery");
        }
    }
}

async fn run_loop(engine: Arc<AlertEngine>, mut stop: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(engine.tick_interval);
    let mut bus_sub = engine.bus.clone().map(|b| b.subscribe());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = engine.evaluate().await {
                    warn!(error = %e, "evaluation pass failed");
                }
            }
            event = async {
                match &mut bus_sub {
                    Some(sub) => sub.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                if let Some(event) = event {
                    if event.event_type == "probe.disconnected" {
                        if let Err(e) = engine.evaluate().await {
                            warn!(error = %e, "evaluation pass triggered by disconnect failed");
                        }
                    }
                }
            }
            _ = stop.changed() => {
                info!("alert engine stopping");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legator_core::{Condition, ProbeId, ProbeStatus, Severity};
    use legator_state::MemoryStateStore;
    use std::sync::Mutex as StdMutex;

    struct FakeFleet {
        probes: StdMutex<Vec<legator_core::ProbeSnapshot>>,
    }

    impl FleetSnapshotProvider for FakeFleet {
        fn snapshot(&self) -> Vec<legator_core::ProbeSnapshot> {
            self.probes.lock().unwrap().clone()
        }
    }

    struct NullNotifier;

    impl NotifierPort for NullNotifier {
        fn known_webhook_ids(&self) -> Vec<legator_core::WebhookId> {
            vec![]
        }
        fn notify(&self, _event_type: &str, _probe_id: ProbeId, _summary: String, _detail: serde_json::Value) {}
    }

    fn offline_rule(duration: &str) -> AlertRule {
        let now = Utc::now();
        AlertRule {
            id: legator_core::RuleId::from("r-offline"),
            name: "probe offline".into(),
            description: String::new(),
            enabled: true,
            condition: Condition::ProbeOffline {
                duration: duration.into(),
                tags: vec![],
            },
            actions: vec![],
            severity: Some(Severity::Critical),
            created_at: now,
            updated_at: now,
        }
    }

    fn offline_probe(id: &str, minutes_ago: i64) -> legator_core::ProbeSnapshot {
        legator_core::ProbeSnapshot {
            id: ProbeId::from(id),
            status: ProbeStatus::Offline,
            last_seen: Utc::now() - chrono::Duration::minutes(minutes_ago),
            tags: vec![],
            inventory: None,
            last_heartbeat: None,
        }
    }

    async fn build_engine(
        rule: AlertRule,
        probes: Vec<legator_core::ProbeSnapshot>,
    ) -> (Arc<AlertEngine>, Arc<MemoryStateStore>) {
        let store = Arc::new(MemoryStateStore::new());
        store.create_rule(rule).await.unwrap();
        let fleet = Arc::new(FakeFleet {
            probes: StdMutex::new(probes),
        });
        let engine = AlertEngine::new(
            store.clone(),
            store.clone(),
            fleet,
            Arc::new(NullNotifier),
            None,
        )
        .await
        .unwrap();
        (Arc::new(engine), store)
    }

    #[tokio::test]
    async fn offline_probe_fires_once_across_two_passes() {
        let (engine, _store) = build_engine(offline_rule("2m"), vec![offline_probe("p1", 3)]).await;

        engine.evaluate().await.unwrap();
        assert_eq!(engine.snapshot_firing().await.len(), 1);

        engine.evaluate().await.unwrap();
        let firing = engine.snapshot_firing().await;
        assert_eq!(firing.len(), 1);
        assert_eq!(firing[0].probe_id, ProbeId::from("p1"));
    }

    #[tokio::test]
    async fn disk_threshold_message_reports_percentages() {
        let rule = {
            let now = Utc::now();
            AlertRule {
                id: legator_core::RuleId::from("r-disk"),
                name: "disk full".into(),
                description: String::new(),
                enabled: true,
                condition: Condition::DiskThreshold {
                    threshold_pct: 80.0,
                    duration: String::new(),
                    tags: vec![],
                },
                actions: vec![],
                severity: None,
                created_at: now,
                updated_at: now,
            }
        };
        let mut probe = offline_probe("p1", 0);
        probe.status = ProbeStatus::Online;
        probe.last_heartbeat = Some(legator_core::HeartbeatSample {
            load: [0.0, 0.0, 0.0],
            mem_used: 0,
            mem_total: 0,
            disk_used: 95,
            disk_total: 100,
        });
        let (engine, _store) = build_engine(rule, vec![probe]).await;

        engine.evaluate().await.unwrap();
        let firing = engine.snapshot_firing().await;
        assert_eq!(firing.len(), 1);
        assert!(firing[0].message.contains("95.0%"));
        assert!(firing[0].message.contains("80.0%"));
    }

    #[tokio::test]
    async fn probe_coming_back_online_resolves_the_alert() {
        let (engine, store) = build_engine(offline_rule("1m"), vec![offline_probe("p1", 2)]).await;
        engine.evaluate().await.unwrap();
        assert_eq!(engine.snapshot_firing().await.len(), 1);

        let mut online_probe = offline_probe("p1", 0);
        online_probe.status = ProbeStatus::Online;
        // The fleet trait object has no setter, so simulate "probe came
        // back online" by rehydrating a fresh engine against the same
        // store with an updated fleet view — exercising startup
        // rehydration along the way.
        drop(engine);
        let new_fleet = Arc::new(FakeFleet {
            probes: StdMutex::new(vec![online_probe]),
        });
        let engine2 = AlertEngine::new(
            store.clone(),
            store.clone(),
            new_fleet,
            Arc::new(NullNotifier),
            None,
        )
        .await
        .unwrap();
        // The rehydrated engine picks up the still-firing event from the
        // store, matching spec.md's startup-rehydration guarantee.
        assert_eq!(engine2.snapshot_firing().await.len(), 1);

        engine2.evaluate().await.unwrap();
        assert_eq!(engine2.snapshot_firing().await.len(), 0);

        let history = store.events_for_rule(&legator_core::RuleId::from("r-offline")).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, legator_core::AlertStatus::Resolved);
        assert!(history[0].resolved_at.is_some());
    }

    #[tokio::test]
    async fn pending_timer_gates_sustained_conditions() {
        let rule = {
            let now = Utc::now();
            AlertRule {
                id: legator_core::RuleId::from("r-cpu"),
                name: "cpu hot".into(),
                description: String::new(),
                enabled: true,
                condition: Condition::CpuThreshold {
                    threshold_pct: 50.0,
                    duration: "1h".into(),
                    tags: vec![],
                },
                actions: vec![],
                severity: None,
                created_at: now,
                updated_at: now,
            }
        };
        let mut probe = offline_probe("p1", 0);
        probe.status = ProbeStatus::Online;
        probe.last_heartbeat = Some(legator_core::HeartbeatSample {
            load: [1.0, 0.0, 0.0],
            mem_used: 0,
            mem_total: 0,
            disk_used: 0,
            disk_total: 0,
        });
        let (engine, _store) = build_engine(rule, vec![probe]).await;

        // Duration is 1h, so a single pass only opens the pending timer.
        engine.evaluate().await.unwrap();
        assert_eq!(engine.snapshot_firing().await.len(), 0);
    }
}
