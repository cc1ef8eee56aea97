use thiserror::Error;

/// Errors shared across the wire-protocol and data-model layer.
///
/// These are validation-class errors per spec.md §7: never retried, surfaced
/// to API callers as a 4xx class with a machine-readable `code()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid duration {0}")]
    InvalidDuration(String),

    #[error("unsupported condition type: {0}")]
    UnsupportedCondition(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid matcher field: {0}")]
    InvalidMatcherField(String),
}

impl CoreError {
    /// Machine-readable error code, per spec.md §7's "4xx class with a
    /// machine-readable code and human message".
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDuration(_) => "invalid_duration",
            Self::UnsupportedCondition(_) => "unsupported_condition",
            Self::MissingField(_) => "missing_field",
            Self::InvalidMatcherField(_) => "invalid_matcher_field",
        }
    }
}
