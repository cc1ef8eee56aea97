use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use legator_core::{
    AlertEvent, AlertKey, AlertRule, AlertStatus, EscalationPolicy, EscalationPolicyId,
    RoutingPolicy, RoutingPolicyId, RuleId, WebhookConfig, WebhookId,
};

use crate::error::StateError;
use crate::traits::{
    AlertEventStore, EscalationPolicyStore, RoutingPolicyStore, RuleStore, WebhookStore,
};

/// Reference persistence backend used for tests, examples, and any
/// deployment that doesn't need durability across restarts — the only
/// backend this core ships, per SPEC_FULL.md §6.1. Every map is an
/// independent `DashMap`, matching `acteon-state-memory`'s one-map-per-kind
/// layout rather than a single keyspace.
#[derive(Default)]
pub struct MemoryStateStore {
    rules: DashMap<RuleId, AlertRule>,
    routing_policies: DashMap<RoutingPolicyId, RoutingPolicy>,
    escalation_policies: DashMap<EscalationPolicyId, EscalationPolicy>,
    webhooks: DashMap<WebhookId, WebhookConfig>,
    alert_events: DashMap<AlertKey, AlertEvent>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleStore for MemoryStateStore {
    async fn create_rule(&self, rule: AlertRule) -> Result<AlertRule, StateError> {
        self.rules.insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn update_rule(&self, mut rule: AlertRule) -> Result<AlertRule, StateError> {
        let existing = self
            .rules
            .get(&rule.id)
            .ok_or_else(|| StateError::NotFound(rule.id.to_string()))?;
        rule.created_at = existing.created_at;
        drop(existing);
        self.rules.insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn get_rule(&self, id: &RuleId) -> Result<AlertRule, StateError> {
        self.rules
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    async fn list_rules(&self) -> Result<Vec<AlertRule>, StateError> {
        let mut rules: Vec<AlertRule> = self.rules.iter().map(|e| e.value().clone()).collect();
        rules.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rules)
    }

    async fn delete_rule(&self, id: &RuleId) -> Result<(), StateError> {
        self.rules.remove(id);
        Ok(())
    }
}

#[async_trait]
impl RoutingPolicyStore for MemoryStateStore {
    async fn create_policy(&self, policy: RoutingPolicy) -> Result<RoutingPolicy, StateError> {
        self.routing_policies.insert(policy.id.clone(), policy.clone());
        Ok(policy)
    }

    async fn update_policy(&self, mut policy: RoutingPolicy) -> Result<RoutingPolicy, StateError> {
        let existing = self
            .routing_policies
            .get(&policy.id)
            .ok_or_else(|| StateError::NotFound(policy.id.to_string()))?;
        policy.created_at = existing.created_at;
        drop(existing);
        self.routing_policies.insert(policy.id.clone(), policy.clone());
        Ok(policy)
    }

    async fn get_policy(&self, id: &RoutingPolicyId) -> Result<RoutingPolicy, StateError> {
        self.routing_policies
            .get(id)
            .map(|p| p.clone())
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    async fn list_policies(&self) -> Result<Vec<RoutingPolicy>, StateError> {
        let mut policies: Vec<RoutingPolicy> =
            self.routing_policies.iter().map(|e| e.value().clone()).collect();
        policies.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        Ok(policies)
    }

    async fn delete_policy(&self, id: &RoutingPolicyId) -> Result<(), StateError> {
        self.routing_policies.remove(id);
        Ok(())
    }
}

#[async_trait]
impl EscalationPolicyStore for MemoryStateStore {
    async fn create_escalation(&self, policy: EscalationPolicy) -> Result<EscalationPolicy, StateError> {
        self.escalation_policies.insert(policy.id.clone(), policy.clone());
        Ok(policy)
    }

    async fn update_escalation(&self, mut policy: EscalationPolicy) -> Result<EscalationPolicy, StateError> {
        let existing = self
            .escalation_policies
            .get(&policy.id)
            .ok_or_else(|| StateError::NotFound(policy.id.to_string()))?;
        policy.created_at = existing.created_at;
        drop(existing);
        self.escalation_policies.insert(policy.id.clone(), policy.clone());
        Ok(policy)
    }

    async fn get_escalation(&self, id: &EscalationPolicyId) -> Result<EscalationPolicy, StateError> {
        self.escalation_policies
            .get(id)
            .map(|p| p.clone())
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    async fn list_escalations(&self) -> Result<Vec<EscalationPolicy>, StateError> {
        let mut policies: Vec<EscalationPolicy> =
            self.escalation_policies.iter().map(|e| e.value().clone()).collect();
        policies.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(policies)
    }

    async fn delete_escalation(&self, id: &EscalationPolicyId) -> Result<(), StateError> {
        self.escalation_policies.remove(id);
        Ok(())
    }
}

#[async_trait]
impl WebhookStore for MemoryStateStore {
    async fn create_webhook(&self, webhook: WebhookConfig) -> Result<WebhookConfig, StateError> {
        self.webhooks.insert(webhook.id.clone(), webhook.clone());
        Ok(webhook)
    }

    async fn update_webhook(&self, webhook: WebhookConfig) -> Result<WebhookConfig, StateError> {
        if !self.webhooks.contains_key(&webhook.id) {
            return Err(StateError::NotFound(webhook.id.to_string()));
        }
        self.webhooks.insert(webhook.id.clone(), webhook.clone());
        Ok(webhook)
    }

    async fn get_webhook(&self, id: &WebhookId) -> Result<WebhookConfig, StateError> {
        self.webhooks
            .get(id)
            .map(|w| w.clone())
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    async fn list_webhooks(&self) -> Result<Vec<WebhookConfig>, StateError> {
        Ok(self.webhooks.iter().map(|e| e.value().clone()).collect())
    }

    async fn delete_webhook(&self, id: &WebhookId) -> Result<(), StateError> {
        self.webhooks.remove(id);
        Ok(())
    }
}

#[async_trait]
impl AlertEventStore for MemoryStateStore {
    async fn upsert_event(&self, event: AlertEvent) -> Result<AlertEvent, StateError> {
        self.alert_events.insert(event.key(), event.clone());
        Ok(event)
    }

    async fn active_alerts(&self) -> Result<Vec<AlertEvent>, StateError> {
        Ok(self
            .alert_events
            .iter()
            .filter(|e| e.value().status == AlertStatus::Firing)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn events_for_rule(&self, rule_id: &RuleId) -> Result<Vec<AlertEvent>, StateError> {
        let mut events: Vec<AlertEvent> = self
            .alert_events
            .iter()
            .filter(|e| &e.value().rule_id == rule_id)
            .map(|e| e.value().clone())
            .collect();
        events.sort_by(|a, b| b.fired_at.cmp(&a.fired_at));
        Ok(events)
    }
}

/// Stamp `created_at`/`updated_at` to now; a small helper used by
/// `legator-server`'s CRUD handlers (kept here since every memory-backed
/// caller needs the same "server assigns timestamps" behavior spec.md §6
/// describes).
#[must_use]
pub fn now() -> chrono::DateTime<Utc> {
    Utc::now()
}
