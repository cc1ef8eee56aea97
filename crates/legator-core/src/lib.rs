//! Wire protocol and shared data model for the Legator fleet control plane.
//!
//! This crate is linked by both ends of the system: the probe-side
//! connection client (`legator-probe`) and every control-plane crate. It has
//! no knowledge of transport, persistence, or HTTP — just the shapes in
//! spec.md §3 and §6.

pub mod duration;
pub mod envelope;
pub mod error;
pub mod event;
pub mod ids;
pub mod notification;
pub mod probe;
pub mod routing;
pub mod rule;
pub mod webhook;

pub use duration::{format_duration_secs, parse_rule_duration};
pub use envelope::{
    CommandPayload, CommandResultPayload, Envelope, ErrorPayload, HeartbeatPayload, MessageType,
    OutputChunkPayload, RegisterPayload,
};
pub use error::CoreError;
pub use event::{AlertEvent, AlertKey, AlertStatus};
pub use ids::{
    AlertEventId, EscalationPolicyId, ProbeId, RequestId, RoutingPolicyId, RuleId, WebhookId,
};
pub use notification::{BusEvent, NotificationPayload};
pub use probe::{match_tags, HeartbeatSample, Inventory, ProbeSnapshot, ProbeStatus};
pub use routing::{
    EscalationPolicy, EscalationStep, EscalationTargetType, Matcher, MatcherField, MatcherOp,
    RoutingContext, RoutingExplain, RoutingOutcome, RoutingPolicy,
};
pub use rule::{AlertRule, Condition, RuleAction, Severity};
pub use webhook::{mask_url, DeliveryRecord, WebhookConfig};
