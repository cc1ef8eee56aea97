use thiserror::Error;

use legator_core::RequestId;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("unknown request: {0}")]
    UnknownRequest(RequestId),
}
