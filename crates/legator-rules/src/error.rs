use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rule or event store error: {0}")]
    Store(#[from] legator_state::StateError),

    #[error("invalid condition duration: {0}")]
    InvalidDuration(String),
}
