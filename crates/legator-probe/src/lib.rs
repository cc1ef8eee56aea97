//! Reconnecting WebSocket connection to the fleet control plane, per
//! spec.md §4.1. Ships as a library plus an example probe binary
//! (`examples/probe_agent.rs`) rather than its own compiled agent, since
//! this workspace's scope stops at the control plane.

pub mod backoff;
pub mod client;
pub mod config;
pub mod error;

pub use backoff::ReconnectState;
pub use client::{ConnectionState, ProbeClient};
pub use config::ProbeClientConfig;
pub use error::ProbeError;
