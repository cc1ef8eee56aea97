use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use legator_core::{EscalationPolicy, EscalationPolicyId};

use crate::error::ServerError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<EscalationPolicy>>, ServerError> {
    Ok(Json(state.escalations.list_escalations().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EscalationPolicy>, ServerError> {
    Ok(Json(
        state.escalations.get_escalation(&EscalationPolicyId::from(id)).await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    Json(mut policy): Json<EscalationPolicy>,
) -> Result<(StatusCode, Json<EscalationPolicy>), ServerError> {
    validate(&policy)?;
    let now = Utc::now();
    policy.created_at = now;
    policy.updated_at = now;
    let created = state.escalations.create_escalation(policy).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut policy): Json<EscalationPolicy>,
) -> Result<Json<EscalationPolicy>, ServerError> {
    validate(&policy)?;
    policy.id = EscalationPolicyId::from(id);
    policy.updated_at = Utc::now();
    Ok(Json(state.escalations.update_escalation(policy).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.escalations.delete_escalation(&EscalationPolicyId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate(policy: &EscalationPolicy) -> Result<(), ServerError> {
    if policy.name.trim().is_empty() {
        return Err(ServerError::Validation(
            "escalation policy name must not be empty".into(),
        ));
    }
    if policy.steps.is_empty() {
        return Err(ServerError::Validation(
            "escalation policy must have at least one step".into(),
        ));
    }
    Ok(())
}
