use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{LeadId, LeadRecord};
use super::qualification::Responses;
use super::repository::{LeadRepository, RepositoryError};
use super::routing::{Roster, RoutingError};
use super::service::{LeadService, LeadServiceError};

#[derive(Debug, Deserialize)]
pub struct StepEvaluationRequest {
    #[serde(default)]
    pub responses: Responses,
}

#[derive(Debug, Deserialize)]
pub struct QualifyRequest {
    pub workflow_id: String,
    #[serde(default)]
    pub responses: Responses,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Either the name of a registered roster or an inline one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RosterRef {
    Named(String),
    Inline(Roster),
}

#[derive(Debug, Deserialize)]
pub struct AssignmentRequest {
    pub strategy: String,
    #[serde(default)]
    pub roster: Option<RosterRef>,
    /// Literal owner returned by the `direct` strategy.
    #[serde(default)]
    pub owner: Option<String>,
    pub record: LeadRecord,
}

/// Router builder exposing qualification, routing, and assignment endpoints.
pub fn lead_router<R>(service: Arc<LeadService<R>>) -> Router
where
    R: LeadRepository + 'static,
{
    Router::new()
        .route("/api/v1/leads", post(register_handler::<R>))
        .route("/api/v1/leads/:lead_id", get(lead_handler::<R>))
        .route("/api/v1/leads/:lead_id/qualify", post(qualify_handler::<R>))
        .route("/api/v1/leads/:lead_id/route", post(route_handler::<R>))
        .route(
            "/api/v1/qualification/:workflow_id/steps/:step_index",
            post(evaluate_step_handler::<R>),
        )
        .route("/api/v1/assignments", post(assignment_handler::<R>))
        .route("/api/v1/routing/rules", get(rules_handler::<R>))
        .with_state(service)
}

pub(crate) async fn register_handler<R>(
    State(service): State<Arc<LeadService<R>>>,
    axum::Json(record): axum::Json<LeadRecord>,
) -> Response
where
    R: LeadRepository + 'static,
{
    match service.register(record) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.summary_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn lead_handler<R>(
    State(service): State<Arc<LeadService<R>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    R: LeadRepository + 'static,
{
    match service.get(&LeadId(lead_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn evaluate_step_handler<R>(
    State(service): State<Arc<LeadService<R>>>,
    Path((workflow_id, step_index)): Path<(String, usize)>,
    axum::Json(request): axum::Json<StepEvaluationRequest>,
) -> Response
where
    R: LeadRepository + 'static,
{
    match service.evaluate_step(&workflow_id, step_index, &request.responses) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn qualify_handler<R>(
    State(service): State<Arc<LeadService<R>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<QualifyRequest>,
) -> Response
where
    R: LeadRepository + 'static,
{
    let QualifyRequest {
        workflow_id,
        responses,
        notes,
    } = request;

    match service.qualify(&LeadId(lead_id), &workflow_id, &responses, notes) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn route_handler<R>(
    State(service): State<Arc<LeadService<R>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    R: LeadRepository + 'static,
{
    match service.route(&LeadId(lead_id)) {
        Ok(decision) => (StatusCode::OK, axum::Json(decision)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn assignment_handler<R>(
    State(service): State<Arc<LeadService<R>>>,
    axum::Json(request): axum::Json<AssignmentRequest>,
) -> Response
where
    R: LeadRepository + 'static,
{
    let roster = match request.roster {
        Some(RosterRef::Inline(roster)) => roster,
        Some(RosterRef::Named(name)) => match service.roster(&name) {
            Ok(roster) => roster,
            Err(error) => return error_response(error),
        },
        None => Roster::new("unspecified", &[]),
    };

    match service.resolve_assignment_for(
        &request.strategy,
        request.owner.as_deref(),
        &roster,
        &request.record,
    ) {
        Ok(assignment) => (StatusCode::OK, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rules_handler<R>(State(service): State<Arc<LeadService<R>>>) -> Response
where
    R: LeadRepository + 'static,
{
    let snapshot = service.routing().rules().snapshot();
    let payload = json!({
        "version": snapshot.version,
        "rules": &*snapshot.rules,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn error_response(error: LeadServiceError) -> Response {
    let (status, retryable) = match &error {
        LeadServiceError::Validation(_) | LeadServiceError::Routing(RoutingError::Validation(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, false)
        }
        LeadServiceError::Assignment(_) | LeadServiceError::Routing(RoutingError::Assignment(_)) => {
            (StatusCode::CONFLICT, false)
        }
        LeadServiceError::Routing(RoutingError::ConcurrencyConflict { .. }) => {
            (StatusCode::CONFLICT, true)
        }
        LeadServiceError::Routing(RoutingError::UnknownRule(_))
        | LeadServiceError::Repository(RepositoryError::NotFound) => (StatusCode::NOT_FOUND, false),
        LeadServiceError::Repository(RepositoryError::Conflict) => (StatusCode::CONFLICT, false),
        LeadServiceError::Repository(RepositoryError::Unavailable(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, true)
        }
    };

    let payload = json!({
        "error": error.to_string(),
        "retryable": retryable,
    });
    (status, axum::Json(payload)).into_response()
}
