use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use legator_core::{AlertRule, RuleId};

use crate::error::ServerError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<AlertRule>>, ServerError> {
    Ok(Json(state.rules.list_rules().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AlertRule>, ServerError> {
    Ok(Json(state.rules.get_rule(&RuleId::from(id)).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(mut rule): Json<AlertRule>,
) -> Result<(StatusCode, Json<AlertRule>), ServerError> {
    validate(&rule)?;
    let now = Utc::now();
    rule.created_at = now;
    rule.updated_at = now;
    let created = state.rules.create_rule(rule).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut rule): Json<AlertRule>,
) -> Result<Json<AlertRule>, ServerError> {
    validate(&rule)?;
    rule.id = RuleId::from(id);
    rule.updated_at = Utc::now();
    Ok(Json(state.rules.update_rule(rule).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.rules.delete_rule(&RuleId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validation errors a malformed rule can surface, per spec.md §7's
/// "bad rule... malformed duration, unsupported condition type" class.
fn validate(rule: &AlertRule) -> Result<(), ServerError> {
    if rule.name.trim().is_empty() {
        return Err(ServerError::Validation("rule name must not be empty".into()));
    }
    let duration = rule.condition.duration_str();
    if !duration.is_empty() && legator_core::parse_rule_duration(duration).is_err() {
        return Err(ServerError::Validation(format!(
            "malformed duration: {duration}"
        )));
    }
    for action in &rule.actions {
        let legator_core::RuleAction::Webhook { webhook_id } = action;
        if webhook_id.as_str().trim().is_empty() {
            return Err(ServerError::Validation("webhook action missing webhook_id".into()));
        }
    }
    Ok(())
}
