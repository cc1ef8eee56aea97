use async_trait::async_trait;
use legator_core::{
    AlertEvent, EscalationPolicy, EscalationPolicyId, RoutingPolicy, RoutingPolicyId, RuleId,
    WebhookConfig, WebhookId,
};

use crate::error::StateError;

/// CRUD + ordered-list contract for alert rules, per spec.md §6.
///
/// Implementations must be `Send + Sync`: the Alert Engine calls `list`
/// once per evaluation pass, potentially concurrently with admin mutations.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Create a rule. If `rule.id` is the zero-value default it is
    /// server-assigned; otherwise the caller-supplied id is preserved.
    async fn create_rule(&self, rule: legator_core::AlertRule) -> Result<legator_core::AlertRule, StateError>;

    /// Update a rule, preserving `created_at` from the existing row.
    async fn update_rule(&self, rule: legator_core::AlertRule) -> Result<legator_core::AlertRule, StateError>;

    async fn get_rule(&self, id: &RuleId) -> Result<legator_core::AlertRule, StateError>;

    /// List all rules ordered by `updated_at` descending, per spec.md §6.
    async fn list_rules(&self) -> Result<Vec<legator_core::AlertRule>, StateError>;

    /// Idempotent: deleting an absent id is not an error.
    async fn delete_rule(&self, id: &RuleId) -> Result<(), StateError>;
}

/// CRUD + ordered-list contract for routing policies.
#[async_trait]
pub trait RoutingPolicyStore: Send + Sync {
    async fn create_policy(&self, policy: RoutingPolicy) -> Result<RoutingPolicy, StateError>;
    async fn update_policy(&self, policy: RoutingPolicy) -> Result<RoutingPolicy, StateError>;
    async fn get_policy(&self, id: &RoutingPolicyId) -> Result<RoutingPolicy, StateError>;

    /// Ordered by priority descending, ties broken by `updated_at`
    /// descending, per spec.md §4.3/§8.
    async fn list_policies(&self) -> Result<Vec<RoutingPolicy>, StateError>;

    async fn delete_policy(&self, id: &RoutingPolicyId) -> Result<(), StateError>;
}

/// CRUD contract for escalation policies, ordered by `updated_at` descending.
#[async_trait]
pub trait EscalationPolicyStore: Send + Sync {
    async fn create_escalation(&self, policy: EscalationPolicy) -> Result<EscalationPolicy, StateError>;
    async fn update_escalation(&self, policy: EscalationPolicy) -> Result<EscalationPolicy, StateError>;
    async fn get_escalation(&self, id: &EscalationPolicyId) -> Result<EscalationPolicy, StateError>;
    async fn list_escalations(&self) -> Result<Vec<EscalationPolicy>, StateError>;
    async fn delete_escalation(&self, id: &EscalationPolicyId) -> Result<(), StateError>;
}

/// CRUD contract for webhook configs. List ordering is unspecified per
/// spec.md §6.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn create_webhook(&self, webhook: WebhookConfig) -> Result<WebhookConfig, StateError>;
    async fn update_webhook(&self, webhook: WebhookConfig) -> Result<WebhookConfig, StateError>;
    async fn get_webhook(&self, id: &WebhookId) -> Result<WebhookConfig, StateError>;
    async fn list_webhooks(&self) -> Result<Vec<WebhookConfig>, StateError>;
    async fn delete_webhook(&self, id: &WebhookId) -> Result<(), StateError>;
}

/// Alert event persistence, keyed by event id with upsert semantics per
/// spec.md §3's "the store's upsert semantics guarantee a single row".
#[async_trait]
pub trait AlertEventStore: Send + Sync {
    async fn upsert_event(&self, event: AlertEvent) -> Result<AlertEvent, StateError>;

    /// All events with `status = firing`, used for startup rehydration
    /// (spec.md §4.2) and the `active_alerts()` query from spec.md §6.
    async fn active_alerts(&self) -> Result<Vec<AlertEvent>, StateError>;

    /// All events for a given rule, newest first — used by diagnostics and
    /// tests asserting resolution history (spec.md §8 scenario 3).
    async fn events_for_rule(&self, rule_id: &RuleId) -> Result<Vec<AlertEvent>, StateError>;
}
