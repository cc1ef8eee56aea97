//! Persistence contracts and an in-memory reference backend for the Legator
//! control plane's rules, routing policies, escalation policies, webhook
//! configs, and alert events — spec.md §3 and §6.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StateError;
pub use memory::MemoryStateStore;
pub use traits::{
    AlertEventStore, EscalationPolicyStore, RoutingPolicyStore, RuleStore, WebhookStore,
};
