use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use legator_bus::EventBus;
use legator_core::ProbeId;
use legator_rules::AlertEngine;
use legator_state::{EscalationPolicyStore, RoutingPolicyStore, RuleStore, WebhookStore};
use tokio::sync::mpsc;

use crate::fleet::FleetRegistry;

/// Shared application state threaded through every axum handler. Mirrors
/// `acteon-server::api::AppState`'s "one Clone-able bag of Arcs" shape.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<dyn RuleStore>,
    pub routing_policies: Arc<dyn RoutingPolicyStore>,
    pub escalations: Arc<dyn EscalationPolicyStore>,
    pub webhook_store: Arc<dyn WebhookStore>,
    pub notifier: Arc<legator_notifier::WebhookNotifier>,
    pub resolver: Arc<legator_routing::RoutingResolver>,
    pub engine: Arc<AlertEngine>,
    pub tracker: Arc<legator_tracker::CommandTracker>,
    pub fleet: Arc<FleetRegistry>,
    /// Outbound mailbox per connected probe, populated by `ws::upgrade` and
    /// drained by that connection's writer task.
    pub outbound: Arc<DashMap<ProbeId, mpsc::Sender<Message>>>,
    /// Publishes `probe.disconnected` on socket drop, per spec.md §6 — the
    /// event-triggered half of the engine's periodic-plus-event evaluation.
    pub bus: EventBus,
}
