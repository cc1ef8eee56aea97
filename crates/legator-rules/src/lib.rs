//! Periodic and event-triggered alert evaluation, per spec.md §4.2.

pub mod condition;
pub mod engine;
pub mod error;
pub mod ports;

pub use engine::AlertEngine;
pub use error::EngineError;
pub use ports::{FleetSnapshotProvider, NotifierPort};
