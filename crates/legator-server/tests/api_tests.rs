use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use dashmap::DashMap;
use tower::ServiceExt;

use legator_bus::EventBus;
use legator_core::{AlertRule, Condition, RuleId, Severity};
use legator_notifier::{NotifyConfig, WebhookNotifier};
use legator_routing::RoutingResolver;
use legator_rules::AlertEngine;
use legator_server::api;
use legator_server::fleet::FleetRegistry;
use legator_server::state::AppState;
use legator_state::MemoryStateStore;
use legator_tracker::CommandTracker;

async fn build_app() -> axum::Router {
    let rules: Arc<MemoryStateStore> = Arc::new(MemoryStateStore::new());
    let notifier = Arc::new(WebhookNotifier::new(NotifyConfig::default()));
    let resolver = Arc::new(RoutingResolver::new(rules.clone(), rules.clone()));
    let fleet = Arc::new(FleetRegistry::new());
    let bus = EventBus::new();

    let engine = Arc::new(
        AlertEngine::new(
            rules.clone(),
            rules.clone(),
            fleet.clone(),
            notifier.clone(),
            Some(bus.clone()),
        )
        .await
        .expect("engine should rehydrate from an empty store"),
    );

    let tracker = Arc::new(CommandTracker::new(Duration::from_secs(120)));

    let state = AppState {
        rules: rules.clone(),
        routing_policies: rules.clone(),
        escalations: rules.clone(),
        webhook_store: rules.clone(),
        notifier,
        resolver,
        engine,
        tracker,
        fleet,
        outbound: Arc::new(DashMap::new()),
        bus,
    };

    api::router(state)
}

fn new_rule(name: &str) -> AlertRule {
    let now = chrono::Utc::now();
    AlertRule {
        id: RuleId::new(),
        name: name.to_owned(),
        description: String::new(),
        enabled: true,
        condition: Condition::ProbeOffline {
            duration: "2m".into(),
            tags: vec![],
        },
        actions: vec![],
        severity: Some(Severity::Warning),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn healthz_returns_ok() {
    let app = build_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rule_crud_round_trip() {
    let app = build_app().await;

    let rule = new_rule("probe offline alert");
    let body = serde_json::to_string(&rule).unwrap();

    let create_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/rules")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create_response.status(), StatusCode::CREATED);

    let created_bytes = axum::body::to_bytes(create_response.into_body(), usize::MAX)
        .await
        .unwrap();
    let created: AlertRule = serde_json::from_slice(&created_bytes).unwrap();
    assert_eq!(created.name, "probe offline alert");

    let list_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/rules")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(list_response.status(), StatusCode::OK);
    let list_bytes = axum::body::to_bytes(list_response.into_body(), usize::MAX)
        .await
        .unwrap();
    let listed: Vec<AlertRule> = serde_json::from_slice(&list_bytes).unwrap();
    assert_eq!(listed.len(), 1);

    let delete_response = app
        .oneshot(
            Request::builder()
                .method(http::Method::DELETE)
                .uri(format!("/rules/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delete_response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn creating_a_rule_with_empty_name_is_rejected() {
    let app = build_app().await;
    let mut rule = new_rule("");
    rule.name = String::new();
    let body = serde_json::to_string(&rule).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/rules")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dispatching_a_command_to_an_unconnected_probe_is_not_found() {
    let app = build_app().await;

    let body = serde_json::json!({
        "probe_id": "no-such-probe",
        "command": "uname",
    })
    .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/commands")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
