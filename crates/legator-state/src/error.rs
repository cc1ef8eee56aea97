use thiserror::Error;

/// Persistence failures, per spec.md §7: a not-found on CRUD is its own
/// class (idempotent on delete); anything else is a generic backend failure
/// that callers log and treat as "the transition is not applied" per the
/// Alert Engine's failure semantics (spec.md §4.2).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(String),
}
