//! Route assembly, per SPEC_FULL.md §10. Deliberately thin: each handler is
//! a few lines translating an HTTP verb into a `legator-state` trait call or
//! a `legator-tracker`/`legator-probe`-flavored dispatch, matching
//! `acteon-server::api::router`'s shape without its auth/rate-limit/OpenAPI
//! layers, which SPEC_FULL.md's ambient surface doesn't call for.

mod commands;
mod escalations;
mod routing_policies;
mod rules;
mod webhooks;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws/probe", get(ws::upgrade))
        .route("/rules", get(rules::list).post(rules::create))
        .route(
            "/rules/{id}",
            get(rules::get).put(rules::update).delete(rules::delete),
        )
        .route(
            "/routing-policies",
            get(routing_policies::list).post(routing_policies::create),
        )
        .route(
            "/routing-policies/{id}",
            get(routing_policies::get)
                .put(routing_policies::update)
                .delete(routing_policies::delete),
        )
        .route(
            "/escalation-policies",
            get(escalations::list).post(escalations::create),
        )
        .route(
            "/escalation-policies/{id}",
            get(escalations::get)
                .put(escalations::update)
                .delete(escalations::delete),
        )
        .route("/webhooks", get(webhooks::list).post(webhooks::create))
        .route(
            "/webhooks/{id}",
            get(webhooks::get).put(webhooks::update).delete(webhooks::delete),
        )
        .route("/commands", post(commands::dispatch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
