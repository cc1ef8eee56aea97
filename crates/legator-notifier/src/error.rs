use thiserror::Error;

use legator_core::WebhookId;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("unknown webhook id: {0}")]
    NotFound(WebhookId),

    #[error("failed to build signed request: {0}")]
    Signing(String),
}
