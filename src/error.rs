//! Error types for the Compensation Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while generating payroll,
//! crediting leave or settling an exit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification of an [`EngineError`].
///
/// Batch jobs use the kind to decide whether a failure aborts the whole run
/// (`ConfigurationMissing`) or is recorded against a single user and the run
/// continues (everything else).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Business rules cannot be applied because configuration is absent or malformed.
    ConfigurationMissing,
    /// A per-user prerequisite (salary structure, employee record, attendance) is absent.
    DependencyMissing,
    /// The operation would break a lifecycle or uniqueness rule.
    InvariantViolation,
    /// The caller supplied an invalid argument.
    InvalidInput,
    /// Storage, locking or timeout failure.
    Infrastructure,
}

/// The main error type for the Compensation Engine.
///
/// # Example
///
/// ```
/// use compensation_engine::error::{EngineError, ErrorKind};
///
/// let error = EngineError::ConfigNotFound {
///     module: "payroll".to_string(),
///     key: "statutory".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration not found: payroll/statutory");
/// assert_eq!(error.kind(), ErrorKind::ConfigurationMissing);
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// No configuration row exists for the module and key.
    #[error("Configuration not found: {module}/{key}")]
    ConfigNotFound {
        /// The configuration module.
        module: String,
        /// The configuration key.
        key: String,
    },

    /// The configuration exists but no active setting resolves.
    #[error("No active setting for configuration {module}/{key} (context: {context})", context = .context_key.as_deref().unwrap_or("-"))]
    ConfigSettingNotFound {
        /// The configuration module.
        module: String,
        /// The configuration key.
        key: String,
        /// The requested context key, if any.
        context_key: Option<String>,
    },

    /// A resolved value does not have the shape its declared type requires.
    #[error("Configuration {module}/{key} is not a valid {expected}: {message}")]
    ConfigValueMismatch {
        /// The configuration module.
        module: String,
        /// The configuration key.
        key: String,
        /// The expected value shape.
        expected: String,
        /// What went wrong.
        message: String,
    },

    /// A configuration file could not be parsed or validated.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The configuration directory does not exist or holds no files.
    #[error("Configuration directory not found: {path}")]
    ConfigDirectoryNotFound {
        /// The directory that was searched.
        path: String,
    },

    /// No salary structure is effective for the user on the date.
    #[error("No salary structure for user '{user_id}' effective on {date}")]
    SalaryStructureNotFound {
        /// The user without a structure.
        user_id: String,
        /// The as-of date used for resolution.
        date: NaiveDate,
    },

    /// The employee directory has no record for the user.
    #[error("Employee not found: {user_id}")]
    EmployeeNotFound {
        /// The missing user.
        user_id: String,
    },

    /// The attendance aggregator could not supply a summary.
    #[error("Attendance unavailable for user '{user_id}' in {month:02}/{year}: {message}")]
    AttendanceUnavailable {
        /// The user.
        user_id: String,
        /// The month requested.
        month: u32,
        /// The year requested.
        year: i32,
        /// The collaborator's explanation.
        message: String,
    },

    /// Payroll for the period is already paid and cannot be regenerated.
    #[error("Payroll for user '{user_id}' in {month:02}/{year} is already paid")]
    PayrollAlreadyPaid {
        /// The user.
        user_id: String,
        /// The payroll month.
        month: u32,
        /// The payroll year.
        year: i32,
    },

    /// The exit month is paid through the full-and-final settlement.
    #[error("Payroll for user '{user_id}' in {month:02}/{year} is settled by the full-and-final settlement")]
    FinalMonthSettled {
        /// The exiting user.
        user_id: String,
        /// The exit month.
        month: u32,
        /// The exit year.
        year: i32,
    },

    /// No payroll record has the given id.
    #[error("Payroll not found: {payroll_id}")]
    PayrollNotFound {
        /// The missing record id.
        payroll_id: String,
    },

    /// A workflow transition is not permitted from the current status.
    #[error("Invalid {entity} status transition: {from} -> {to}")]
    InvalidStatusTransition {
        /// The entity whose status was changed.
        entity: String,
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
    },

    /// A blocking clearance is still pending.
    #[error("Settlement for user '{user_id}' has pending clearances: {}", .pending.join(", "))]
    ClearancePending {
        /// The exiting user.
        user_id: String,
        /// The clearances that block progress.
        pending: Vec<String>,
    },

    /// The settlement has progressed past the point where it can be recalculated.
    #[error("Settlement for user '{user_id}' is locked in status {status}")]
    SettlementLocked {
        /// The exiting user.
        user_id: String,
        /// The current status.
        status: String,
    },

    /// No settlement exists for the user.
    #[error("Settlement not found for user: {user_id}")]
    SettlementNotFound {
        /// The user.
        user_id: String,
    },

    /// An argument was invalid.
    #[error("Invalid input '{field}': {message}")]
    InvalidInput {
        /// The offending field.
        field: String,
        /// What made it invalid.
        message: String,
    },

    /// A collaborator call exceeded its time budget.
    #[error("Operation '{operation}' timed out after {millis}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The budget in milliseconds.
        millis: u64,
    },

    /// The backing store failed.
    #[error("Store error: {message}")]
    Store {
        /// A description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigSettingNotFound { .. }
            | EngineError::ConfigValueMismatch { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::ConfigDirectoryNotFound { .. } => ErrorKind::ConfigurationMissing,
            EngineError::SalaryStructureNotFound { .. }
            | EngineError::EmployeeNotFound { .. }
            | EngineError::AttendanceUnavailable { .. }
            | EngineError::PayrollNotFound { .. }
            | EngineError::SettlementNotFound { .. } => ErrorKind::DependencyMissing,
            EngineError::PayrollAlreadyPaid { .. }
            | EngineError::FinalMonthSettled { .. }
            | EngineError::InvalidStatusTransition { .. }
            | EngineError::ClearancePending { .. }
            | EngineError::SettlementLocked { .. } => ErrorKind::InvariantViolation,
            EngineError::InvalidInput { .. } => ErrorKind::InvalidInput,
            EngineError::Timeout { .. } | EngineError::Store { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Shorthand for an [`EngineError::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn store(message: impl Into<String>) -> Self {
        EngineError::Store {
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_module_and_key() {
        let error = EngineError::ConfigNotFound {
            module: "leave".to_string(),
            key: "calendar_settings".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration not found: leave/calendar_settings"
        );
    }

    #[test]
    fn test_setting_not_found_without_context() {
        let error = EngineError::ConfigSettingNotFound {
            module: "payroll".to_string(),
            key: "statutory".to_string(),
            context_key: None,
        };
        assert_eq!(
            error.to_string(),
            "No active setting for configuration payroll/statutory (context: -)"
        );
    }

    #[test]
    fn test_setting_not_found_with_context() {
        let error = EngineError::ConfigSettingNotFound {
            module: "leave".to_string(),
            key: "calendar_settings".to_string(),
            context_key: Some("2025-2026".to_string()),
        };
        assert!(error.to_string().contains("context: 2025-2026"));
    }

    #[test]
    fn test_salary_structure_not_found_displays_user_and_date() {
        let error = EngineError::SalaryStructureNotFound {
            user_id: "emp_001".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        };
        assert_eq!(
            error.to_string(),
            "No salary structure for user 'emp_001' effective on 2025-06-30"
        );
        assert_eq!(error.kind(), ErrorKind::DependencyMissing);
    }

    #[test]
    fn test_payroll_already_paid_is_invariant_violation() {
        let error = EngineError::PayrollAlreadyPaid {
            user_id: "emp_001".to_string(),
            month: 3,
            year: 2025,
        };
        assert_eq!(
            error.to_string(),
            "Payroll for user 'emp_001' in 03/2025 is already paid"
        );
        assert_eq!(error.kind(), ErrorKind::InvariantViolation);
    }

    #[test]
    fn test_clearance_pending_lists_clearances() {
        let error = EngineError::ClearancePending {
            user_id: "emp_009".to_string(),
            pending: vec!["assets".to_string(), "cards".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Settlement for user 'emp_009' has pending clearances: assets, cards"
        );
    }

    #[test]
    fn test_infrastructure_kinds() {
        let timeout = EngineError::Timeout {
            operation: "payroll:emp_001".to_string(),
            millis: 500,
        };
        assert_eq!(timeout.kind(), ErrorKind::Infrastructure);
        assert_eq!(EngineError::store("poisoned").kind(), ErrorKind::Infrastructure);
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_missing_employee() -> EngineResult<()> {
            Err(EngineError::EmployeeNotFound {
                user_id: "ghost".to_string(),
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_missing_employee()?;
            Ok(())
        }

        assert!(matches!(
            propagates_error(),
            Err(EngineError::EmployeeNotFound { .. })
        ));
    }
}
