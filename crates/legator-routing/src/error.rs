use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing policy store error: {0}")]
    Store(#[from] legator_state::StateError),
}
