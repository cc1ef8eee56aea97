//! Priority-ordered routing policy resolution, per spec.md §4.3.

pub mod error;

use std::sync::Arc;

use legator_core::{
    Matcher, MatcherField, MatcherOp, RoutingContext, RoutingExplain, RoutingOutcome,
    RoutingPolicy,
};
use legator_state::{EscalationPolicyStore, RoutingPolicyStore};
use tracing::instrument;

pub use error::RoutingError;

/// Resolves a `RoutingContext` against persisted routing/escalation
/// policies. Holds only the two narrow store interfaces it needs, per
/// spec.md §9's "dependency injection of narrow interfaces" design note —
/// it does not own either store.
pub struct RoutingResolver {
    policies: Arc<dyn RoutingPolicyStore>,
    escalations: Arc<dyn EscalationPolicyStore>,
}

impl RoutingResolver {
    #[must_use]
    pub fn new(
        policies: Arc<dyn RoutingPolicyStore>,
        escalations: Arc<dyn EscalationPolicyStore>,
    ) -> Self {
        Self {
            policies,
            escalations,
        }
    }

    #[instrument(skip(self, ctx), fields(rule_id = %ctx.rule_id, condition_type = %ctx.condition_type))]
    pub async fn resolve(&self, ctx: &RoutingContext) -> Result<RoutingOutcome, RoutingError> {
        let policies = self.policies.list_policies().await?;

        if policies.is_empty() {
            return Ok(no_policies_outcome(ctx));
        }

        let mut matched_by = None;
        let mut chosen: Option<&RoutingPolicy> = None;

        for policy in &policies {
            if policy.is_default {
                continue;
            }
            if let Some(reason) = matches(policy, ctx) {
                chosen = Some(policy);
                matched_by = Some(reason);
                break;
            }
        }

        let fallback_used = chosen.is_none();
        if chosen.is_none() {
            chosen = policies.iter().find(|p| p.is_default);
            if chosen.is_some() {
                matched_by = Some("default policy".to_owned());
            }
        }

        let Some(policy) = chosen else {
            return Ok(no_policies_outcome(ctx));
        };

        let escalation_steps = match policy.escalation_policy_id.clone() {
            Some(id) => self
                .escalations
                .get_escalation(&id)
                .await
                .map(|p| p.steps)
                .unwrap_or_default(),
            None => Vec::new(),
        };

        Ok(RoutingOutcome {
            rule_id: ctx.rule_id.clone(),
            probe_id: ctx.probe_id.clone(),
            policy_id: Some(policy.id.clone()),
            policy_name: policy.name.clone(),
            owner_label: Some(policy.owner_label.clone()),
            owner_contact: policy.owner_contact.clone(),
            runbook_url: policy.runbook_url.clone(),
            escalation_policy_id: policy.escalation_policy_id.clone(),
            escalation_steps,
            explain: RoutingExplain {
                matched_by: matched_by.unwrap_or_default(),
                fallback_used,
                reason: if fallback_used {
                    "no non-default policy matched".to_owned()
                } else {
                    "matched a non-default policy".to_owned()
                },
            },
        })
    }
}

fn no_policies_outcome(ctx: &RoutingContext) -> RoutingOutcome {
    RoutingOutcome {
        rule_id: ctx.rule_id.clone(),
        probe_id: ctx.probe_id.clone(),
        policy_id: None,
        policy_name: "none".to_owned(),
        owner_label: None,
        owner_contact: None,
        runbook_url: None,
        escalation_policy_id: None,
        escalation_steps: Vec::new(),
        explain: RoutingExplain {
            matched_by: String::new(),
            fallback_used: true,
            reason: "no routing policies configured".to_owned(),
        },
    }
}

/// `Some(matched_by)` if every matcher in `policy` matches `ctx` (an empty
/// matcher list is a wildcard), `None` otherwise.
fn matches(policy: &RoutingPolicy, ctx: &RoutingContext) -> Option<String> {
    if policy.matchers.is_empty() {
        return Some("wildcard (no matchers)".to_owned());
    }
    for m in &policy.matchers {
        if !matcher_matches(m, ctx) {
            return None;
        }
    }
    let last = policy.matchers.last()?;
    Some(format!("{}={}", field_name(last.field), last.value))
}

fn matcher_matches(m: &Matcher, ctx: &RoutingContext) -> bool {
    match m.field {
        MatcherField::Severity => ctx
            .severity
            .map(|s| compare(severity_name(s), &m.value, m.op))
            .unwrap_or(false),
        MatcherField::ConditionType => compare(&ctx.condition_type, &m.value, m.op),
        MatcherField::RuleName => compare(&ctx.rule_name, &m.value, m.op),
        MatcherField::Tag => ctx.tags.iter().any(|t| compare(t, &m.value, m.op)),
    }
}

fn compare(actual: &str, expected: &str, op: MatcherOp) -> bool {
    let actual = actual.trim().to_lowercase();
    let expected = expected.trim().to_lowercase();
    match op {
        MatcherOp::Eq => actual == expected,
        MatcherOp::Contains => actual.contains(&expected),
        MatcherOp::Prefix => actual.starts_with(&expected),
    }
}

fn severity_name(s: legator_core::Severity) -> &'static str {
    match s {
        legator_core::Severity::Info => "info",
        legator_core::Severity::Warning => "warning",
        legator_core::Severity::Critical => "critical",
    }
}

fn field_name(f: MatcherField) -> &'static str {
    match f {
        MatcherField::Severity => "severity",
        MatcherField::ConditionType => "condition_type",
        MatcherField::RuleName => "rule_name",
        MatcherField::Tag => "tag",
    }
}
