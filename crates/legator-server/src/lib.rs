//! Library half of the Legator control-plane server: route assembly,
//! shared state, and configuration, split out from the `main.rs` binary
//! entry point so integration tests can exercise the router directly —
//! mirroring `acteon-server`'s own `[lib]`/`[[bin]]` split.

pub mod api;
pub mod config;
pub mod error;
pub mod fleet;
pub mod state;
pub mod ws;
