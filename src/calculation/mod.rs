//! Calculation logic for the Compensation Engine.
//!
//! Every function here is pure: it takes resolved inputs and a typed rule
//! snapshot and returns its value together with an [`AuditStep`]. This
//! covers money rounding and proration, salary structure lookup, payable
//! days, statutory deductions and loss of pay, bonus aggregation, holiday
//! compensation, leave accrual, gratuity, leave encashment, notice recovery
//! and clearance gating, plus the two composed calculators
//! [`calculate_payroll`] and [`calculate_fnf`].
//!
//! [`AuditStep`]: crate::models::AuditStep

mod attendance;
mod bonus;
mod clearance;
mod deductions;
mod encashment;
mod fnf;
mod gratuity;
mod holiday;
mod leave_accrual;
mod money;
mod notice;
mod payroll;
mod proration;
mod salary_lookup;

pub use attendance::{PayableDaysResult, calculate_payable_days};
pub use bonus::{BonusAggregation, aggregate_bonuses};
pub use clearance::{CLEARANCE_KINDS, check_clearance_gate, pending_blocking_clearances};
pub use deductions::{
    LossOfPayResult, StatutoryDeductionResult, calculate_loss_of_pay,
    calculate_statutory_deductions,
};
pub use encashment::{EncashmentResult, calculate_leave_encashment};
pub use fnf::{FinalMonthInput, FnfCalculation, FnfInput, calculate_fnf};
pub use gratuity::{GratuityResult, calculate_gratuity, service_period, service_years};
pub use holiday::{HolidayCompensationResult, calculate_holiday_compensation};
pub use leave_accrual::{
    CarryForwardResult, JoiningCreditResult, PeriodicCreditResult, calculate_carry_forward,
    calculate_joining_credit, calculate_periodic_credit, first_month_fraction, round_leave_days,
};
pub use money::{MONEY_SCALE, per_day, percentage_of, prorate, round_money};
pub use notice::{NoticeRecoveryResult, calculate_notice_recovery};
pub use payroll::{PayrollCalculation, PayrollInput, calculate_payroll};
pub use proration::{ProrationResult, prorate_earnings};
pub use salary_lookup::{SalaryLookupResult, resolve_salary_structure};
