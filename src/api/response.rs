//! Error responses for the Compensation Engine API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ErrorKind};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A 400 response.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

fn code(error: &EngineError) -> &'static str {
    match error {
        EngineError::ConfigNotFound { .. }
        | EngineError::ConfigSettingNotFound { .. }
        | EngineError::ConfigValueMismatch { .. }
        | EngineError::ConfigParseError { .. }
        | EngineError::ConfigDirectoryNotFound { .. } => "CONFIG_ERROR",
        EngineError::SalaryStructureNotFound { .. } => "SALARY_STRUCTURE_NOT_FOUND",
        EngineError::EmployeeNotFound { .. } => "EMPLOYEE_NOT_FOUND",
        EngineError::AttendanceUnavailable { .. } => "ATTENDANCE_UNAVAILABLE",
        EngineError::PayrollAlreadyPaid { .. } => "PAYROLL_ALREADY_PAID",
        EngineError::FinalMonthSettled { .. } => "FINAL_MONTH_SETTLED",
        EngineError::PayrollNotFound { .. } => "PAYROLL_NOT_FOUND",
        EngineError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
        EngineError::ClearancePending { .. } => "CLEARANCE_PENDING",
        EngineError::SettlementLocked { .. } => "SETTLEMENT_LOCKED",
        EngineError::SettlementNotFound { .. } => "SETTLEMENT_NOT_FOUND",
        EngineError::InvalidInput { .. } => "VALIDATION_ERROR",
        EngineError::Timeout { .. } => "TIMEOUT",
        EngineError::Store { .. } => "STORE_ERROR",
    }
}

fn status(error: &EngineError) -> StatusCode {
    match error.kind() {
        ErrorKind::ConfigurationMissing => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::DependencyMissing => match error {
            EngineError::EmployeeNotFound { .. }
            | EngineError::PayrollNotFound { .. }
            | EngineError::SettlementNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        },
        ErrorKind::InvariantViolation => StatusCode::CONFLICT,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Infrastructure => match error {
            EngineError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let kind = serde_json::to_value(error.kind())
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        ApiErrorResponse {
            status: status(&error),
            error: ApiError::with_details(code(&error), error.to_string(), kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_paid_payroll_is_conflict() {
        let response: ApiErrorResponse = EngineError::PayrollAlreadyPaid {
            user_id: "emp_001".to_string(),
            month: 9,
            year: 2025,
        }
        .into();
        assert_eq!(response.status, StatusCode::CONFLICT);
        assert_eq!(response.error.code, "PAYROLL_ALREADY_PAID");
        assert_eq!(response.error.details.as_deref(), Some("invariant_violation"));
    }

    #[test]
    fn test_missing_structure_is_unprocessable() {
        let response: ApiErrorResponse = EngineError::SalaryStructureNotFound {
            user_id: "emp_001".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 9, 30).unwrap(),
        }
        .into();
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_missing_config_is_server_error() {
        let response: ApiErrorResponse = EngineError::ConfigNotFound {
            module: "payroll".to_string(),
            key: "statutory".to_string(),
        }
        .into();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error.code, "CONFIG_ERROR");
    }
}
