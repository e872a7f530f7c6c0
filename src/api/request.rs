//! Request bodies for the Compensation Engine API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{ClearanceKind, ClearanceStatus, FnfStatus, PayrollPeriod};

fn default_actor() -> String {
    "system".to_string()
}

/// A month, as sent by clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PeriodRequest {
    /// Month, 1 to 12.
    pub month: u32,
    /// Year.
    pub year: i32,
}

impl PeriodRequest {
    /// Validates the month.
    pub fn to_period(self) -> EngineResult<PayrollPeriod> {
        PayrollPeriod::new(self.month, self.year)
    }
}

/// Body of `POST /payroll/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePayrollRequest {
    /// The employee.
    pub user_id: String,
    /// The month.
    #[serde(flatten)]
    pub period: PeriodRequest,
    /// Who triggered the run.
    #[serde(default = "default_actor")]
    pub generated_by: String,
}

/// Body of `POST /payroll/bulk` and `POST /leave/monthly-accrual`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// The month.
    #[serde(flatten)]
    pub period: PeriodRequest,
    /// Who triggered the run.
    #[serde(default = "default_actor")]
    pub triggered_by: String,
}

/// Body of the payroll workflow endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRequest {
    /// Who performs the action.
    pub actor: String,
}

/// Body of `POST /leave/joining-credit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoiningCreditRequest {
    /// The new hire.
    pub user_id: String,
    /// Date of joining.
    pub date_of_joining: NaiveDate,
    /// Who triggered the credit.
    #[serde(default = "default_actor")]
    pub created_by: String,
}

/// Body of `POST /leave/carry-forward`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarryForwardRequest {
    /// Label of the closing financial year, e.g. `2025-2026`.
    pub financial_year: String,
    /// Who triggered the run.
    #[serde(default = "default_actor")]
    pub triggered_by: String,
}

/// Body of `POST /fnf/:user_id/clearance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearanceRequest {
    /// Which clearance.
    pub kind: ClearanceKind,
    /// Its new state.
    pub status: ClearanceStatus,
    /// Who recorded it.
    pub updated_by: String,
}

/// Body of `POST /fnf/:user_id/advance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceRequest {
    /// Status to move to.
    pub target: FnfStatus,
    /// Who performs the move.
    pub actor: String,
}
