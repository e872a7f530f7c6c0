//! Payroll records, bonuses and their workflow states.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, EngineResult};

use super::{AuditTrace, PayrollPeriod};

/// Lifecycle of a payroll record.
///
/// `DRAFT → GENERATED → APPROVED → PAID`, with `CANCELLED` reachable from any
/// state except `PAID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayrollStatus {
    /// Being assembled, not yet persisted.
    Draft,
    /// Computed and stored; may be regenerated.
    Generated,
    /// Approved for payment; bonuses are consumed.
    Approved,
    /// Paid out. Terminal.
    Paid,
    /// Withdrawn.
    Cancelled,
}

impl PayrollStatus {
    /// Returns true if the workflow permits moving to `next`.
    ///
    /// ```
    /// use compensation_engine::models::PayrollStatus;
    ///
    /// assert!(PayrollStatus::Generated.can_transition_to(PayrollStatus::Approved));
    /// assert!(!PayrollStatus::Paid.can_transition_to(PayrollStatus::Cancelled));
    /// ```
    pub fn can_transition_to(&self, next: PayrollStatus) -> bool {
        use PayrollStatus::*;
        matches!(
            (self, next),
            (Draft, Generated)
                | (Generated, Approved)
                | (Approved, Paid)
                | (Draft | Generated | Approved, Cancelled)
        )
    }

    /// Validates a transition, naming both ends on failure.
    pub fn transition(&self, next: PayrollStatus) -> EngineResult<PayrollStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(EngineError::InvalidStatusTransition {
                entity: "payroll".to_string(),
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for PayrollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayrollStatus::Draft => "DRAFT",
            PayrollStatus::Generated => "GENERATED",
            PayrollStatus::Approved => "APPROVED",
            PayrollStatus::Paid => "PAID",
            PayrollStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a discretionary bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BonusStatus {
    /// Awaiting payroll.
    Pending,
    /// Paid through an approved payroll or settlement.
    Paid,
    /// Withdrawn.
    Cancelled,
}

/// A per-user discretionary credit for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bonus {
    /// Bonus id; also the consumption idempotency key.
    pub id: String,
    /// Recipient.
    pub user_id: String,
    /// Month the bonus is paid with.
    pub applicable_month: u32,
    /// Year the bonus is paid with.
    pub applicable_year: i32,
    /// Amount.
    pub amount: Decimal,
    /// Free-text reason.
    #[serde(default)]
    pub reason: String,
    /// Current status.
    pub status: BonusStatus,
    /// Payroll or settlement that reserved this bonus.
    #[serde(default)]
    pub consumed_by: Option<String>,
}

impl Bonus {
    /// True if the bonus applies to `period`.
    pub fn applies_to(&self, period: PayrollPeriod) -> bool {
        self.applicable_month == period.month && self.applicable_year == period.year
    }
}

/// A bonus itemized on a payroll record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusDetail {
    /// Bonus id.
    pub bonus_id: String,
    /// Amount.
    pub amount: Decimal,
    /// Reason copied from the bonus.
    pub reason: String,
}

/// Attendance counts copied onto the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceCounts {
    /// Calendar days.
    pub total_days: u32,
    /// `total − holidays − weekoffs`.
    pub working_days: u32,
    /// Days present.
    pub present_days: u32,
    /// Days absent.
    pub absent_days: u32,
    /// Paid leave days.
    pub paid_leave_days: Decimal,
    /// Unpaid leave days.
    pub unpaid_leave_days: Decimal,
    /// Holidays.
    pub holidays: u32,
    /// Holidays worked.
    pub holidays_worked: u32,
    /// Weekly offs.
    pub weekoffs: u32,
    /// Half days.
    pub half_days: u32,
    /// Days the employee is paid for.
    pub payable_days: Decimal,
}

/// Prorated earnings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProratedEarnings {
    /// Basic.
    pub basic: Decimal,
    /// HRA.
    pub hra: Decimal,
    /// Conveyance.
    pub conveyance_allowance: Decimal,
    /// Medical.
    pub medical_allowance: Decimal,
    /// Special.
    pub special_allowance: Decimal,
    /// Other.
    pub other_allowances: Decimal,
}

impl ProratedEarnings {
    /// Sum of all prorated components.
    pub fn total(&self) -> Decimal {
        self.basic
            + self.hra
            + self.conveyance_allowance
            + self.medical_allowance
            + self.special_allowance
            + self.other_allowances
    }
}

/// Deduction components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deductions {
    /// Employee PF.
    pub employee_pf: Decimal,
    /// Employer PF (reported for CTC, never deducted).
    pub employer_pf: Decimal,
    /// Employee state insurance.
    pub esic: Decimal,
    /// Professional tax.
    pub professional_tax: Decimal,
    /// Tax deducted at source.
    pub tds: Decimal,
    /// Loss of pay.
    pub lop_deduction: Decimal,
}

impl Deductions {
    /// Employee-side total: everything except employer PF.
    pub fn total(&self) -> Decimal {
        self.employee_pf + self.esic + self.professional_tax + self.tds + self.lop_deduction
    }
}

/// One payroll record per (user, month, year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRecord {
    /// Record id; stable across regenerations.
    pub id: String,
    /// Employee.
    pub user_id: String,
    /// Month.
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Workflow status.
    pub status: PayrollStatus,
    /// Salary structure version used.
    pub salary_structure_id: String,
    /// Date used to resolve the salary structure.
    pub structure_as_of: NaiveDate,
    /// Attendance summary.
    pub attendance: AttendanceCounts,
    /// Prorated earnings.
    pub earnings: ProratedEarnings,
    /// Deductions.
    pub deductions: Deductions,
    /// Sum of itemized bonuses.
    pub total_bonus: Decimal,
    /// Bonuses reserved by this record.
    pub bonus_details: Vec<BonusDetail>,
    /// Money credit for holidays worked.
    pub holiday_bonus: Decimal,
    /// Leave days credited for holidays worked.
    pub holiday_leaves_credited: Decimal,
    /// `Σ earnings + total_bonus + holiday_bonus`.
    pub gross_earnings: Decimal,
    /// `Σ deductions` (LOP included, employer PF excluded).
    pub total_deductions: Decimal,
    /// `gross_earnings − total_deductions`.
    pub net_payable: Decimal,
    /// Rule-by-rule trace with warnings.
    pub audit_trace: AuditTrace,
    /// First generation.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Approver.
    #[serde(default)]
    pub approved_by: Option<String>,
    /// Approval time.
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    /// Payment time.
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl PayrollRecord {
    /// The period this record covers.
    pub fn period(&self) -> PayrollPeriod {
        PayrollPeriod {
            year: self.year,
            month: self.month,
        }
    }
}
