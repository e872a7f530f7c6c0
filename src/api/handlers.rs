//! HTTP request handlers for the Compensation Engine API.
//!
//! Every endpoint takes a JSON body, tags the request with a correlation id
//! and maps engine errors onto status codes through [`ApiErrorResponse`].

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::services::{FnfRequest, SalaryRevisionRequest};

use super::request::{
    ActorRequest, AdvanceRequest, BatchRequest, CarryForwardRequest, ClearanceRequest,
    GeneratePayrollRequest, JoiningCreditRequest,
};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Body of `POST /fnf/calculate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateFnfRequest {
    /// The exit to settle.
    #[serde(flatten)]
    pub exit: FnfRequest,
    /// Who ran the calculation.
    pub calculated_by: String,
}

/// Body of `POST /salary/revise`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviseSalaryRequest {
    /// The new version.
    #[serde(flatten)]
    pub revision: SalaryRevisionRequest,
    /// Who approved the change.
    pub changed_by: String,
}

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/payroll/generate", post(generate_payroll_handler))
        .route("/payroll/bulk", post(bulk_payroll_handler))
        .route("/payroll/:id/approve", post(approve_payroll_handler))
        .route("/payroll/:id/pay", post(pay_payroll_handler))
        .route("/payroll/:id/cancel", post(cancel_payroll_handler))
        .route("/leave/joining-credit", post(joining_credit_handler))
        .route("/leave/monthly-accrual", post(monthly_accrual_handler))
        .route("/leave/carry-forward", post(carry_forward_handler))
        .route("/salary/revise", post(revise_salary_handler))
        .route("/fnf/calculate", post(calculate_fnf_handler))
        .route("/fnf/:user_id/clearance", post(clearance_handler))
        .route("/fnf/:user_id/advance", post(advance_fnf_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], Json(body)).into_response()
}

/// Unwraps a JSON body or builds the 400 response for it.
#[allow(clippy::result_large_err)]
fn parse_body<T>(
    correlation_id: Uuid,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, Response> {
    let rejection = match payload {
        Ok(Json(request)) => return Ok(request),
        Err(rejection) => rejection,
    };
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    Err(ApiErrorResponse::bad_request(error).into_response())
}

/// Logs and renders the outcome of one operation.
fn finish<T: Serialize>(
    correlation_id: Uuid,
    operation: &str,
    started: Instant,
    result: EngineResult<T>,
) -> Response {
    let duration = started.elapsed();
    match result {
        Ok(body) => {
            info!(
                correlation_id = %correlation_id,
                operation,
                duration_us = duration.as_micros(),
                "Request completed"
            );
            json_response(StatusCode::OK, body)
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                operation,
                kind = ?err.kind(),
                error = %err,
                duration_us = duration.as_micros(),
                "Request failed"
            );
            let api_error: ApiErrorResponse = err.into();
            json_response(api_error.status, api_error.error)
        }
    }
}

async fn generate_payroll_handler(
    State(state): State<AppState>,
    payload: Result<Json<GeneratePayrollRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(correlation_id = %correlation_id, user_id = %request.user_id, "Generating payroll");

    let started = Instant::now();
    let result = request.period.to_period().and_then(|period| {
        state
            .payroll()
            .generate_payroll(&request.user_id, period, &request.generated_by)
    });
    finish(correlation_id, "generate_payroll", started, result)
}

async fn bulk_payroll_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(correlation_id = %correlation_id, "Generating bulk payroll");

    let started = Instant::now();
    let result = match request.period.to_period() {
        Ok(period) => {
            state
                .payroll()
                .generate_bulk_payroll(period, &request.triggered_by)
                .await
        }
        Err(err) => Err(err),
    };
    finish(correlation_id, "generate_bulk_payroll", started, result)
}

async fn approve_payroll_handler(
    State(state): State<AppState>,
    Path(payroll_id): Path<String>,
    payload: Result<Json<ActorRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = state.payroll().approve_payroll(&payroll_id, &request.actor);
    finish(correlation_id, "approve_payroll", started, result)
}

async fn pay_payroll_handler(
    State(state): State<AppState>,
    Path(payroll_id): Path<String>,
    payload: Result<Json<ActorRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = state.payroll().mark_payroll_paid(&payroll_id, &request.actor);
    finish(correlation_id, "mark_payroll_paid", started, result)
}

async fn cancel_payroll_handler(
    State(state): State<AppState>,
    Path(payroll_id): Path<String>,
    payload: Result<Json<ActorRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = state.payroll().cancel_payroll(&payroll_id, &request.actor);
    finish(correlation_id, "cancel_payroll", started, result)
}

async fn joining_credit_handler(
    State(state): State<AppState>,
    payload: Result<Json<JoiningCreditRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = state.leave().credit_joining_leaves(
        &request.user_id,
        request.date_of_joining,
        &request.created_by,
    );
    finish(correlation_id, "credit_joining_leaves", started, Ok(result))
}

async fn monthly_accrual_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = match request.period.to_period() {
        Ok(period) => {
            state
                .leave()
                .run_monthly_accrual(period, &request.triggered_by)
                .await
        }
        Err(err) => Err(err),
    };
    finish(correlation_id, "run_monthly_accrual", started, result)
}

async fn carry_forward_handler(
    State(state): State<AppState>,
    payload: Result<Json<CarryForwardRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = state
        .leave()
        .carry_forward(&request.financial_year, &request.triggered_by)
        .await;
    finish(correlation_id, "carry_forward", started, result)
}

async fn revise_salary_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReviseSalaryRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = state
        .salary()
        .revise_structure(&request.revision, &request.changed_by)
        .map(|revision| revision.created);
    finish(correlation_id, "revise_structure", started, result)
}

async fn calculate_fnf_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculateFnfRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(correlation_id = %correlation_id, user_id = %request.exit.user_id, "Calculating settlement");

    let started = Instant::now();
    let result = state.fnf().calculate_fnf(&request.exit, &request.calculated_by);
    finish(correlation_id, "calculate_fnf", started, result)
}

async fn clearance_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<ClearanceRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = state.fnf().update_clearance(
        &user_id,
        request.kind,
        request.status,
        &request.updated_by,
    );
    finish(correlation_id, "update_clearance", started, result)
}

async fn advance_fnf_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<AdvanceRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = state.fnf().advance_fnf(&user_id, request.target, &request.actor);
    finish(correlation_id, "advance_fnf", started, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Fixture;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn create_test_router() -> Router {
        create_router(AppState::new(Fixture::new().ctx))
    }

    async fn post_json(router: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_generate_returns_record() {
        let (status, json) = post_json(
            create_test_router(),
            "/payroll/generate",
            r#"{"user_id": "emp_001", "month": 9, "year": 2025, "generated_by": "hr"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["outcome"], "generated");
        assert_eq!(json["record"]["status"], "GENERATED");
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let (status, json) =
            post_json(create_test_router(), "/payroll/generate", "{ invalid json }").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_field_returns_validation_error() {
        let (status, json) =
            post_json(create_test_router(), "/payroll/generate", r#"{"month": 9, "year": 2025}"#)
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_invalid_month_returns_400() {
        let (status, json) = post_json(
            create_test_router(),
            "/payroll/generate",
            r#"{"user_id": "emp_001", "month": 0, "year": 2025}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_payroll_returns_404() {
        let (status, json) = post_json(
            create_test_router(),
            "/payroll/missing/approve",
            r#"{"actor": "hr"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "PAYROLL_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_advance_without_settlement_returns_404() {
        let (status, _) = post_json(
            create_test_router(),
            "/fnf/emp_001/advance",
            r#"{"target": "PENDING_CLEARANCE", "actor": "hr"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_content_type_returns_400() {
        let response = create_test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/leave/carry-forward")
                    .body(Body::from(r#"{"financial_year": "2025-2026"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
