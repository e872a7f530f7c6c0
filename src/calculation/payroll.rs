//! The composed monthly payroll calculation.
//!
//! [`calculate_payroll`] is a pure function of the resolved salary structure,
//! the attendance summary, the period's bonuses and a [`PayrollRules`]
//! snapshot. Persistence and workflow live in the payroll service.

use rust_decimal::Decimal;

use crate::config::PayrollRules;
use crate::models::{
    AttendanceCounts, AttendanceSummary, AuditStep, AuditTrace, AuditWarning, Bonus, BonusDetail,
    Deductions, PayrollPeriod, ProratedEarnings, SalaryStructure, WarningSeverity,
};

use super::attendance::calculate_payable_days;
use super::bonus::aggregate_bonuses;
use super::deductions::{calculate_loss_of_pay, calculate_statutory_deductions};
use super::holiday::calculate_holiday_compensation;
use super::proration::prorate_earnings;

/// Inputs to one user's monthly payroll.
#[derive(Debug, Clone, Copy)]
pub struct PayrollInput<'a> {
    /// The user.
    pub user_id: &'a str,
    /// The month being paid.
    pub period: PayrollPeriod,
    /// Structure effective on the last day of `period`.
    pub structure: &'a SalaryStructure,
    /// Attendance for `period`.
    pub attendance: &'a AttendanceSummary,
    /// The user's bonuses; only pending ones for `period` are used.
    pub bonuses: &'a [Bonus],
    /// Id of the record being regenerated, if any.
    pub payroll_id: Option<&'a str>,
    /// Rules in force.
    pub rules: &'a PayrollRules,
}

/// The money side of a payroll record.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollCalculation {
    /// Attendance counts with payable days.
    pub attendance: AttendanceCounts,
    /// Prorated earnings.
    pub earnings: ProratedEarnings,
    /// Deductions including loss of pay.
    pub deductions: Deductions,
    /// Sum of itemized bonuses.
    pub total_bonus: Decimal,
    /// Itemized bonuses.
    pub bonus_details: Vec<BonusDetail>,
    /// Holiday bonus in `bonus` mode.
    pub holiday_bonus: Decimal,
    /// Holiday leave in `leave` mode.
    pub holiday_leaves_credited: Decimal,
    /// Category receiving holiday leave.
    pub holiday_leave_category: Option<String>,
    /// `Σ earnings + total_bonus + holiday_bonus`.
    pub gross_earnings: Decimal,
    /// `Σ deductions` including loss of pay, excluding employer PF.
    pub total_deductions: Decimal,
    /// `gross_earnings − total_deductions`.
    pub net_payable: Decimal,
    /// Steps and warnings.
    pub audit_trace: AuditTrace,
}

/// Computes one user's payroll for a month.
///
/// Steps, in audit order: payable days, earnings proration, statutory
/// deductions, loss of pay, bonus aggregation, holiday compensation, totals.
/// Non-fatal findings (`ZERO_WORKING_DAYS`, `PAYABLE_DAYS_CAPPED`,
/// `WORKING_DAYS_MISMATCH`, `NEGATIVE_NET_PAY`) are attached to the trace.
///
/// # Example
///
/// ```
/// use compensation_engine::calculation::{PayrollInput, calculate_payroll};
/// use compensation_engine::config::{
///     DeductionBasis, HolidayCompensationConfig, HolidayCompensationMode, PayrollRules,
///     StatutoryConfig,
/// };
/// use compensation_engine::models::{
///     AttendanceSummary, IncrementType, PayrollPeriod, SalaryComponents, SalaryStructure,
/// };
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let structure = SalaryStructure::new(
///     "emp_001",
///     SalaryComponents { basic: Decimal::from(30000), ..Default::default() },
///     NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
///     IncrementType::Initial,
/// ).unwrap();
/// let attendance = AttendanceSummary {
///     total_days: 30,
///     present_days: 25,
///     paid_leave_days: Decimal::from(2),
///     ..Default::default()
/// };
/// let rules = PayrollRules {
///     statutory: StatutoryConfig {
///         deduction_basis: DeductionBasis::Structure,
///         pf_employee_percentage: Decimal::ZERO,
///         pf_employer_percentage: Decimal::ZERO,
///         pf_wage_ceiling: None,
///         esic_employee_percentage: Decimal::ZERO,
///         esic_gross_limit: None,
///         professional_tax: None,
///         apply_lop_deduction: true,
///     },
///     holiday: HolidayCompensationConfig {
///         mode: HolidayCompensationMode::None,
///         bonus_multiplier: Decimal::ONE,
///         leaves_per_holiday: Decimal::ONE,
///         leave_category: None,
///     },
/// };
///
/// let result = calculate_payroll(PayrollInput {
///     user_id: "emp_001",
///     period: PayrollPeriod::new(9, 2025).unwrap(),
///     structure: &structure,
///     attendance: &attendance,
///     bonuses: &[],
///     payroll_id: None,
///     rules: &rules,
/// });
/// assert_eq!(result.attendance.payable_days, Decimal::from(27));
/// assert_eq!(result.earnings.basic, Decimal::from(27000));
/// ```
pub fn calculate_payroll(input: PayrollInput<'_>) -> PayrollCalculation {
    let mut trace = AuditTrace::default();
    let components = input.structure.components();

    let days = calculate_payable_days(input.attendance, input.rules.holiday.mode, trace.next_step());
    trace.push(days.audit_step);
    days.warnings.into_iter().for_each(|w| trace.warn(w));
    let counts = days.counts;

    let proration = prorate_earnings(
        components,
        counts.payable_days,
        counts.working_days,
        trace.next_step(),
    );
    trace.push(proration.audit_step);
    if let Some(warning) = proration.warning {
        trace.warn(warning);
    }
    let earnings = proration.earnings;

    let statutory = calculate_statutory_deductions(
        components,
        &earnings,
        &input.rules.statutory,
        trace.next_step(),
    );
    trace.push(statutory.audit_step);
    let mut deductions = statutory.deductions;

    let lop = calculate_loss_of_pay(
        components.basic,
        counts.working_days,
        counts.unpaid_leave_days,
        input.rules.statutory.apply_lop_deduction,
        trace.next_step(),
    );
    trace.push(lop.audit_step);
    deductions.lop_deduction = lop.amount;

    let bonuses = aggregate_bonuses(input.bonuses, input.period, input.payroll_id, trace.next_step());
    trace.push(bonuses.audit_step);

    let holiday = calculate_holiday_compensation(
        components.basic,
        counts.working_days,
        counts.holidays_worked,
        &input.rules.holiday,
        trace.next_step(),
    );
    trace.push(holiday.audit_step);

    let gross_earnings = earnings.total() + bonuses.total + holiday.bonus;
    let total_deductions = deductions.total();
    let net_payable = gross_earnings - total_deductions;

    if net_payable < Decimal::ZERO {
        trace.warn(AuditWarning::new(
            "NEGATIVE_NET_PAY",
            format!(
                "Deductions {} exceed gross earnings {} for {}",
                total_deductions, gross_earnings, input.user_id
            ),
            WarningSeverity::High,
        ));
    }

    trace.push(AuditStep {
        step_number: trace.next_step(),
        rule_id: "payroll_totals".to_string(),
        rule_name: "Payroll Totals".to_string(),
        reference: "payroll.totals".to_string(),
        input: serde_json::json!({
            "prorated_earnings": earnings.total().to_string(),
            "total_bonus": bonuses.total.to_string(),
            "holiday_bonus": holiday.bonus.to_string(),
            "deductions": total_deductions.to_string()
        }),
        output: serde_json::json!({
            "gross_earnings": gross_earnings.to_string(),
            "total_deductions": total_deductions.to_string(),
            "net_payable": net_payable.to_string()
        }),
        reasoning: format!(
            "{} gross − {} deductions = {} net for {}",
            gross_earnings, total_deductions, net_payable, input.period
        ),
    });

    PayrollCalculation {
        attendance: counts,
        earnings,
        deductions,
        total_bonus: bonuses.total,
        bonus_details: bonuses.details,
        holiday_bonus: holiday.bonus,
        holiday_leaves_credited: holiday.leave_days,
        holiday_leave_category: holiday.leave_category,
        gross_earnings,
        total_deductions,
        net_payable,
        audit_trace: trace,
    }
}
