use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EscalationPolicyId, ProbeId, RoutingPolicyId, RuleId};
use crate::rule::Severity;

/// Field a routing matcher compares, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherField {
    Severity,
    ConditionType,
    RuleName,
    Tag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatcherOp {
    #[default]
    Eq,
    Contains,
    Prefix,
}

/// A single matcher clause. Matchers within a policy are conjunctive; an
/// empty matcher list on a policy is a wildcard (spec.md §3/§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matcher {
    pub field: MatcherField,
    #[serde(default)]
    pub op: MatcherOp,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingPolicy {
    pub id: RoutingPolicyId,
    pub name: String,
    pub priority: i64,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub matchers: Vec<Matcher>,
    pub owner_label: String,
    pub owner_contact: Option<String>,
    pub escalation_policy_id: Option<EscalationPolicyId>,
    pub runbook_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTargetType {
    Email,
    Webhook,
    Team,
    Oncall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationStep {
    pub order: u32,
    pub target: String,
    pub target_type: EscalationTargetType,
    pub delay_min: u32,
    pub runbook_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub id: EscalationPolicyId,
    pub name: String,
    pub steps: Vec<EscalationStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to routing resolution, per spec.md §4.3.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub condition_type: String,
    pub severity: Option<Severity>,
    pub tags: Vec<String>,
    pub probe_id: Option<ProbeId>,
}

#[derive(Debug, Clone)]
pub struct RoutingExplain {
    pub matched_by: String,
    pub fallback_used: bool,
    pub reason: String,
}

/// Result of routing resolution, per spec.md §3.
#[derive(Debug, Clone)]
pub struct RoutingOutcome {
    pub rule_id: RuleId,
    pub probe_id: Option<ProbeId>,
    pub policy_id: Option<RoutingPolicyId>,
    pub policy_name: String,
    pub owner_label: Option<String>,
    pub owner_contact: Option<String>,
    pub runbook_url: Option<String>,
    pub escalation_policy_id: Option<EscalationPolicyId>,
    pub escalation_steps: Vec<EscalationStep>,
    pub explain: RoutingExplain,
}
