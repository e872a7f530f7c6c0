//! Full-and-final settlement records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, EngineResult};

use super::{
    AttendanceCounts, AuditTrace, BonusDetail, Deductions, ExitReason, PayrollPeriod,
    ProratedEarnings,
};

/// Lifecycle of a settlement.
///
/// `INITIATED → CALCULATED → PENDING_CLEARANCE → APPROVED → DOCUMENTS_GENERATED
/// → COMPLETED`, or `CANCELLED` from anywhere before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FnfStatus {
    /// Exit recorded, nothing computed yet.
    Initiated,
    /// Amounts computed.
    Calculated,
    /// Waiting for asset, vehicle and card clearances.
    PendingClearance,
    /// Approved for payout.
    Approved,
    /// Relieving documents produced.
    DocumentsGenerated,
    /// Paid and closed. Terminal.
    Completed,
    /// Withdrawn.
    Cancelled,
}

impl FnfStatus {
    /// Returns true if the workflow permits moving to `next`.
    pub fn can_transition_to(&self, next: FnfStatus) -> bool {
        use FnfStatus::*;
        matches!(
            (self, next),
            (Initiated, Calculated)
                | (Calculated, PendingClearance)
                | (PendingClearance, Approved)
                | (Approved, DocumentsGenerated)
                | (DocumentsGenerated, Completed)
                | (
                    Initiated | Calculated | PendingClearance | Approved | DocumentsGenerated,
                    Cancelled
                )
        )
    }

    /// The status that follows this one on the happy path.
    pub fn next(&self) -> Option<FnfStatus> {
        use FnfStatus::*;
        match self {
            Initiated => Some(Calculated),
            Calculated => Some(PendingClearance),
            PendingClearance => Some(Approved),
            Approved => Some(DocumentsGenerated),
            DocumentsGenerated => Some(Completed),
            Completed | Cancelled => None,
        }
    }

    /// True while amounts may still be recomputed.
    pub fn allows_recalculation(&self) -> bool {
        matches!(
            self,
            FnfStatus::Initiated
                | FnfStatus::Calculated
                | FnfStatus::PendingClearance
                | FnfStatus::Cancelled
        )
    }

    /// Validates a transition, naming both ends on failure.
    pub fn transition(&self, next: FnfStatus) -> EngineResult<FnfStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(EngineError::InvalidStatusTransition {
                entity: "fnf_settlement".to_string(),
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for FnfStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FnfStatus::Initiated => "INITIATED",
            FnfStatus::Calculated => "CALCULATED",
            FnfStatus::PendingClearance => "PENDING_CLEARANCE",
            FnfStatus::Approved => "APPROVED",
            FnfStatus::DocumentsGenerated => "DOCUMENTS_GENERATED",
            FnfStatus::Completed => "COMPLETED",
            FnfStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// State of one clearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClearanceStatus {
    /// Not yet cleared.
    Pending,
    /// Cleared.
    Cleared,
    /// Nothing to clear.
    NotApplicable,
}

/// The clearances a settlement tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearanceKind {
    /// Company assets (laptops, phones).
    Assets,
    /// Company vehicles.
    Vehicles,
    /// Fuel and access cards.
    Cards,
}

impl ClearanceKind {
    /// Stable snake_case tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClearanceKind::Assets => "assets",
            ClearanceKind::Vehicles => "vehicles",
            ClearanceKind::Cards => "cards",
        }
    }
}

/// Clearance states of a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clearances {
    /// Asset return.
    pub assets_clearance_status: ClearanceStatus,
    /// Vehicle return.
    pub vehicles_clearance_status: ClearanceStatus,
    /// Card return.
    pub cards_clearance_status: ClearanceStatus,
}

impl Default for Clearances {
    fn default() -> Self {
        Self {
            assets_clearance_status: ClearanceStatus::Pending,
            vehicles_clearance_status: ClearanceStatus::Pending,
            cards_clearance_status: ClearanceStatus::Pending,
        }
    }
}

impl Clearances {
    /// Status of one clearance.
    pub fn get(&self, kind: ClearanceKind) -> ClearanceStatus {
        match kind {
            ClearanceKind::Assets => self.assets_clearance_status,
            ClearanceKind::Vehicles => self.vehicles_clearance_status,
            ClearanceKind::Cards => self.cards_clearance_status,
        }
    }

    /// Updates one clearance.
    pub fn set(&mut self, kind: ClearanceKind, status: ClearanceStatus) {
        match kind {
            ClearanceKind::Assets => self.assets_clearance_status = status,
            ClearanceKind::Vehicles => self.vehicles_clearance_status = status,
            ClearanceKind::Cards => self.cards_clearance_status = status,
        }
    }
}

/// An unsettled reimbursement or advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementItem {
    /// Source record id.
    pub reference: String,
    /// `expense`, `fuel`, `advance`, ...
    pub category: String,
    /// Amount.
    pub amount: Decimal,
}

/// Final partial month pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalMonthPay {
    /// The exit month.
    pub period: PayrollPeriod,
    /// Salary structure version used.
    pub salary_structure_id: String,
    /// Attendance.
    pub attendance: AttendanceCounts,
    /// Prorated earnings.
    pub earnings: ProratedEarnings,
    /// Deductions.
    pub deductions: Deductions,
    /// Pending bonuses for the exit month.
    pub bonus_details: Vec<BonusDetail>,
    /// Sum of `bonus_details`.
    pub total_bonus: Decimal,
}

/// One encashed leave category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncashmentLine {
    /// Leave category code.
    pub category: String,
    /// Financial year the balance belongs to.
    pub financial_year: String,
    /// Days paid out.
    pub days: Decimal,
    /// Per-day rate.
    pub daily_rate: Decimal,
    /// `days × daily_rate`.
    pub amount: Decimal,
}

/// Gratuity computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GratuityLine {
    /// Whether minimum service was met.
    pub eligible: bool,
    /// Counted years of service.
    pub service_years: u32,
    /// Monthly basic used.
    pub basic: Decimal,
    /// Amount after any cap.
    pub amount: Decimal,
    /// Whether the configured maximum applied.
    pub capped: bool,
}

/// Notice period shortfall recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeRecovery {
    /// Notice owed.
    pub required_days: u32,
    /// Notice served.
    pub served_days: u32,
    /// `required − served`, floored at zero.
    pub shortfall_days: u32,
    /// Per-day rate.
    pub daily_salary: Decimal,
    /// Whether the shortfall was waived.
    pub waived: bool,
    /// Amount recovered.
    pub amount: Decimal,
}

/// The reproducible computation behind a settlement.
///
/// Contains no clock-derived values: recomputing from the same stored inputs
/// and configuration serializes to the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryBreakdown {
    /// Last working day.
    pub exit_date: NaiveDate,
    /// Why the employee left.
    pub exit_reason: ExitReason,
    /// Joining date.
    pub date_of_joining: NaiveDate,
    /// Final partial month, unless already paid through payroll.
    pub final_month: Option<FinalMonthPay>,
    /// Encashed leave.
    pub leave_encashment: Vec<EncashmentLine>,
    /// Gratuity.
    pub gratuity: GratuityLine,
    /// Notice recovery.
    pub notice: NoticeRecovery,
    /// Pending reimbursements added to earnings.
    pub reimbursements: Vec<SettlementItem>,
    /// Outstanding advances deducted.
    pub advances: Vec<SettlementItem>,
    /// Sum of earnings.
    pub total_earnings: Decimal,
    /// Sum of deductions.
    pub total_deductions: Decimal,
    /// `total_earnings − total_deductions`.
    pub net_payable: Decimal,
    /// Rule-by-rule trace.
    pub audit_trace: AuditTrace,
}

/// A full-and-final settlement, one per exiting user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnfSettlement {
    /// Settlement id; stable across recalculation.
    pub id: String,
    /// Exiting user.
    pub user_id: String,
    /// Workflow status.
    pub status: FnfStatus,
    /// Last working day.
    pub exit_date: NaiveDate,
    /// Why the employee left.
    pub exit_reason: ExitReason,
    /// When notice was given.
    pub resignation_date: Option<NaiveDate>,
    /// Final month salary net of its statutory deductions.
    pub final_salary: Decimal,
    /// Leave encashment.
    pub leave_encashment_amount: Decimal,
    /// Gratuity.
    pub gratuity_amount: Decimal,
    /// Notice recovery.
    pub notice_period_recovery: Decimal,
    /// Pending reimbursements paid out.
    pub reimbursements_total: Decimal,
    /// Advances recovered.
    pub advances_total: Decimal,
    /// Sum of earnings.
    pub total_earnings: Decimal,
    /// Sum of deductions.
    pub total_deductions: Decimal,
    /// Amount payable to the employee.
    pub net_payable: Decimal,
    /// Clearance states.
    pub clearances: Clearances,
    /// Full computation snapshot.
    pub salary_breakdown: SalaryBreakdown,
    /// Configuration in force at calculation time.
    pub config_snapshot: serde_json::Value,
    /// Bonus ids reserved by this settlement.
    pub bonus_ids: Vec<String>,
    /// Who last calculated.
    pub calculated_by: String,
    /// When last calculated.
    pub calculated_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_walk() {
        let mut status = FnfStatus::Initiated;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            status = status.transition(next).unwrap();
            seen.push(status);
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(status, FnfStatus::Completed);
    }

    #[test]
    fn test_cannot_cancel_completed() {
        assert!(FnfStatus::Approved.can_transition_to(FnfStatus::Cancelled));
        assert!(!FnfStatus::Completed.can_transition_to(FnfStatus::Cancelled));
    }

    #[test]
    fn test_recalculation_window() {
        assert!(FnfStatus::PendingClearance.allows_recalculation());
        assert!(!FnfStatus::Approved.allows_recalculation());
        assert!(!FnfStatus::Completed.allows_recalculation());
    }

    #[test]
    fn test_clearances_default_pending() {
        let mut clearances = Clearances::default();
        assert_eq!(clearances.get(ClearanceKind::Cards), ClearanceStatus::Pending);
        clearances.set(ClearanceKind::Cards, ClearanceStatus::Cleared);
        assert_eq!(clearances.get(ClearanceKind::Cards), ClearanceStatus::Cleared);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(FnfStatus::PendingClearance.to_string(), "PENDING_CLEARANCE");
        assert_eq!(
            serde_json::to_string(&FnfStatus::DocumentsGenerated).unwrap(),
            "\"DOCUMENTS_GENERATED\""
        );
    }
}
