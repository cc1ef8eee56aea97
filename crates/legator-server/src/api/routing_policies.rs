use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use legator_core::{RoutingPolicy, RoutingPolicyId};

use crate::error::ServerError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<RoutingPolicy>>, ServerError> {
    Ok(Json(state.routing_policies.list_policies().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RoutingPolicy>, ServerError> {
    Ok(Json(
        state.routing_policies.get_policy(&RoutingPolicyId::from(id)).await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    Json(mut policy): Json<RoutingPolicy>,
) -> Result<(StatusCode, Json<RoutingPolicy>), ServerError> {
    validate(&policy)?;
    let now = Utc::now();
    policy.created_at = now;
    policy.updated_at = now;
    let created = state.routing_policies.create_policy(policy).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut policy): Json<RoutingPolicy>,
) -> Result<Json<RoutingPolicy>, ServerError> {
    validate(&policy)?;
    policy.id = RoutingPolicyId::from(id);
    policy.updated_at = Utc::now();
    Ok(Json(state.routing_policies.update_policy(policy).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.routing_policies.delete_policy(&RoutingPolicyId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Per spec.md §7's "unknown matcher field" validation class — matcher
/// fields themselves are a closed enum so serde already rejects an unknown
/// field name; what's left to check here is the matcher value being blank.
fn validate(policy: &RoutingPolicy) -> Result<(), ServerError> {
    if policy.name.trim().is_empty() {
        return Err(ServerError::Validation("routing policy name must not be empty".into()));
    }
    for matcher in &policy.matchers {
        if matcher.value.trim().is_empty() {
            return Err(ServerError::Validation("matcher value must not be empty".into()));
        }
    }
    Ok(())
}
