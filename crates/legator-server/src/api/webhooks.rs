use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use legator_core::{WebhookConfig, WebhookId};

use crate::error::ServerError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<WebhookConfig>>, ServerError> {
    Ok(Json(state.webhook_store.list_webhooks().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WebhookConfig>, ServerError> {
    Ok(Json(state.webhook_store.get_webhook(&WebhookId::from(id)).await?))
}

/// Persists the webhook and mirrors it into the live `WebhookNotifier`
/// registry the engine actually delivers through — `legator-state`'s CRUD
/// store and `legator-notifier`'s delivery registry are deliberately
/// separate collaborators per spec.md §9, so this handler is the one place
/// that keeps them in sync.
pub async fn create(
    State(state): State<AppState>,
    Json(mut webhook): Json<WebhookConfig>,
) -> Result<(StatusCode, Json<WebhookConfig>), ServerError> {
    validate(&webhook)?;
    if webhook.id.as_str().trim().is_empty() {
        webhook.id = WebhookId::new();
    }
    let created = state.webhook_store.create_webhook(webhook).await?;
    state.notifier.register(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut webhook): Json<WebhookConfig>,
) -> Result<Json<WebhookConfig>, ServerError> {
    validate(&webhook)?;
    webhook.id = WebhookId::from(id);
    let updated = state.webhook_store.update_webhook(webhook).await?;
    state.notifier.register(updated.clone());
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let id = WebhookId::from(id);
    state.webhook_store.delete_webhook(&id).await?;
    state.notifier.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

fn validate(webhook: &WebhookConfig) -> Result<(), ServerError> {
    if webhook.url.trim().is_empty() {
        return Err(ServerError::Validation("webhook url must not be empty".into()));
    }
    if !webhook.url.starts_with("http://") && !webhook.url.starts_with("https://") {
        return Err(ServerError::Validation(
            "webhook url must be an absolute http(s) url".into(),
        ));
    }
    Ok(())
}
