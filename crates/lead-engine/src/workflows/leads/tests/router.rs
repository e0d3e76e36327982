use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::leads::router::{lead_router, route_handler};
use crate::workflows::leads::qualification::WorkflowCatalog;
use crate::workflows::leads::service::LeadService;

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serializes")))
        .expect("request builds")
}

#[tokio::test]
async fn register_then_route_over_http() {
    let (service, _) = build_service();
    let router = lead_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/v1/leads",
            json!({ "id": "lead-7", "attributes": { "state": "CA", "industry": "Technology" } }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["stage"], "New");

    let response = router
        .oneshot(json_request("/api/v1/leads/lead-7/route", json!({})))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["matched"], true);
    assert_eq!(payload["rule_id"], "ca");
    assert_eq!(payload["assign_to"], "alice");
}

#[tokio::test]
async fn step_evaluation_reports_unmet_criteria() {
    let (service, _) = build_service();
    let router = lead_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            "/api/v1/qualification/bant/steps/0",
            json!({ "responses": { "has_budget": true } }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["can_advance"], false);
    assert_eq!(payload["unmet_criteria"][0]["criterion_id"], "budget_range");
}

#[tokio::test]
async fn out_of_range_step_is_unprocessable() {
    let (service, _) = build_service();
    let router = lead_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            "/api/v1/qualification/bant/steps/9",
            json!({ "responses": {} }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn qualify_endpoint_returns_result() {
    let (service, _) = build_service();
    service
        .register(ca_tech_record("lead-3"))
        .expect("registers");
    let router = lead_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            "/api/v1/leads/lead-3/qualify",
            json!({ "workflow_id": "bant", "responses": bant_responses(true) }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["passed"], true);
    assert_eq!(payload["next_stage"], "qualified");
}

#[tokio::test]
async fn assignment_endpoint_maps_errors_to_conflict() {
    let (service, _) = build_service();
    let router = lead_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/v1/assignments",
            json!({ "strategy": "round_robin", "roster": "sales", "record": { "id": "lead-1" } }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["assignee"], "alice");

    let response = router
        .oneshot(json_request(
            "/api/v1/assignments",
            json!({
                "strategy": "round_robin",
                "roster": { "name": "adhoc", "members": [] },
                "record": { "id": "lead-1" }
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(read_json_body(response).await["retryable"], false);
}

#[tokio::test]
async fn direct_assignment_echoes_the_requested_owner() {
    let (service, _) = build_service();
    let router = lead_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/v1/assignments",
            json!({ "strategy": "direct", "owner": "Pat Quinn", "record": { "id": "lead-1" } }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["assignee"], "Pat Quinn");
    assert_eq!(payload["strategy"], "direct");

    let response = router
        .oneshot(json_request(
            "/api/v1/assignments",
            json!({ "strategy": "direct", "roster": "sales", "record": { "id": "lead-1" } }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn route_handler_returns_not_found_for_missing_lead() {
    let (service, _) = build_service();

    let response = route_handler::<MemoryRepository>(
        State(Arc::new(service)),
        Path("ghost".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repository_outage_is_internal_error() {
    let service = LeadService::new(
        Arc::new(UnavailableRepository),
        Arc::new(WorkflowCatalog::standard()),
        routing_engine(default_rules()),
    );
    let router = lead_router(Arc::new(service));

    let response = router
        .oneshot(json_request("/api/v1/leads", json!({ "id": "lead-1" })))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn rules_endpoint_exposes_match_counts() {
    let (service, _) = build_service();
    service
        .register(ca_tech_record("lead-1"))
        .expect("registers");
    service
        .route(&crate::workflows::leads::domain::LeadId("lead-1".to_string()))
        .expect("routes");
    let router = lead_router(Arc::new(service));

    let response = router
        .oneshot(
            Request::get("/api/v1/routing/rules")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["rules"][0]["id"], "ca");
    assert_eq!(payload["rules"][0]["match_count"], 1);
}
