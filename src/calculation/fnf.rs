//! The composed full-and-final settlement calculation.
//!
//! The final partial month goes through the same payroll pipeline as any
//! other month; encashment, gratuity, notice recovery and expense items are
//! layered on top. The result has no clock-derived fields, so identical
//! inputs serialize to identical JSON.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::{FnfRules, LeaveCategoryConfig, PayrollRules};
use crate::models::{
    AttendanceSummary, AuditStep, AuditTrace, AuditWarning, Bonus, Employee, ExitReason,
    FinalMonthPay, LeaveBalance, PayrollPeriod, SalaryBreakdown, SalaryStructure, SettlementItem,
    WarningSeverity,
};

use super::encashment::calculate_leave_encashment;
use super::gratuity::calculate_gratuity;
use super::money::per_day;
use super::notice::calculate_notice_recovery;
use super::payroll::{PayrollInput, calculate_payroll};

/// Exit-month inputs, absent when that month's payroll is already settled.
#[derive(Debug, Clone, Copy)]
pub struct FinalMonthInput<'a> {
    /// Attendance up to the exit date.
    pub attendance: &'a AttendanceSummary,
    /// The user's bonuses; pending ones for the exit month are paid out.
    pub bonuses: &'a [Bonus],
}

/// Inputs to one settlement.
#[derive(Debug, Clone, Copy)]
pub struct FnfInput<'a> {
    /// The exiting employee.
    pub employee: &'a Employee,
    /// Last working day.
    pub exit_date: NaiveDate,
    /// Why the employee is leaving.
    pub exit_reason: ExitReason,
    /// When notice was given.
    pub resignation_date: Option<NaiveDate>,
    /// Whether a notice shortfall was waived for this exit.
    pub notice_waived: bool,
    /// Structure effective on the exit date.
    pub structure: &'a SalaryStructure,
    /// Exit-month pay inputs.
    pub final_month: Option<FinalMonthInput<'a>>,
    /// Id of the settlement being recalculated, if any.
    pub settlement_id: Option<&'a str>,
    /// Leave balances of the exit financial year, before any encashment debit.
    pub leave_balances: &'a [LeaveBalance],
    /// Leave categories in force.
    pub leave_categories: &'a [LeaveCategoryConfig],
    /// Pending reimbursements owed to the employee.
    pub reimbursements: &'a [SettlementItem],
    /// Advances the employee owes back.
    pub advances: &'a [SettlementItem],
    /// Payroll rules in force on the exit date.
    pub payroll_rules: &'a PayrollRules,
    /// Settlement rules in force on the exit date.
    pub fnf_rules: &'a FnfRules,
}

/// Settlement amounts and their breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct FnfCalculation {
    /// Gross pay for the exit month.
    pub final_salary: Decimal,
    /// Deductions on the exit month's pay.
    pub final_month_deductions: Decimal,
    /// Encashment total.
    pub leave_encashment_amount: Decimal,
    /// Gratuity.
    pub gratuity_amount: Decimal,
    /// Notice recovery.
    pub notice_period_recovery: Decimal,
    /// Reimbursements total.
    pub reimbursements_total: Decimal,
    /// Advances total.
    pub advances_total: Decimal,
    /// Bonuses paid out with the settlement.
    pub bonus_ids: Vec<String>,
    /// Full breakdown.
    pub breakdown: SalaryBreakdown,
}

fn absorb(trace: &mut AuditTrace, other: AuditTrace) {
    for mut step in other.steps {
        step.step_number = trace.next_step();
        trace.push(step);
    }
    other.warnings.into_iter().for_each(|w| trace.warn(w));
}

/// Computes a settlement.
///
/// `total_earnings = final month gross + encashment + gratuity + reimbursements`;
/// `total_deductions = final month deductions + notice recovery + advances`.
pub fn calculate_fnf(input: FnfInput<'_>) -> FnfCalculation {
    let mut trace = AuditTrace::default();
    let basic = input.structure.components().basic;
    let period = PayrollPeriod::containing(input.exit_date);

    let final_month = match input.final_month {
        Some(month) => {
            let payroll = calculate_payroll(PayrollInput {
                user_id: &input.employee.id,
                period,
                structure: input.structure,
                attendance: month.attendance,
                bonuses: month.bonuses,
                payroll_id: input.settlement_id,
                rules: input.payroll_rules,
            });
            let gross = payroll.gross_earnings;
            let deductions = payroll.total_deductions;
            let pay = FinalMonthPay {
                period,
                salary_structure_id: input.structure.id.clone(),
                attendance: payroll.attendance,
                earnings: payroll.earnings,
                deductions: payroll.deductions,
                bonus_details: payroll.bonus_details,
                total_bonus: payroll.total_bonus,
            };
            absorb(&mut trace, payroll.audit_trace);
            Some((pay, gross, deductions))
        }
        None => {
            trace.warn(AuditWarning::new(
                "FINAL_MONTH_ALREADY_PAID",
                format!("Payroll for {} is already approved or paid", period),
                WarningSeverity::Low,
            ));
            None
        }
    };
    let (final_salary, final_month_deductions) = final_month
        .as_ref()
        .map(|(_, gross, deductions)| (*gross, *deductions))
        .unwrap_or((Decimal::ZERO, Decimal::ZERO));

    let encashment = calculate_leave_encashment(
        basic,
        input.leave_balances,
        input.leave_categories,
        &input.fnf_rules.encashment,
        trace.next_step(),
    );
    trace.push(encashment.audit_step);

    let gratuity = calculate_gratuity(
        basic,
        input.employee.date_of_joining,
        input.exit_date,
        &input.fnf_rules.gratuity,
        trace.next_step(),
    );
    trace.push(gratuity.audit_step);

    let daily_salary = per_day(basic, input.fnf_rules.encashment.daily_divisor);
    let notice = calculate_notice_recovery(
        input.exit_reason,
        input.resignation_date,
        input.exit_date,
        daily_salary,
        &input.fnf_rules.notice,
        input.notice_waived,
        trace.next_step(),
    );
    trace.push(notice.audit_step);

    let reimbursements_total: Decimal = input.reimbursements.iter().map(|i| i.amount).sum();
    let advances_total: Decimal = input.advances.iter().map(|i| i.amount).sum();

    let total_earnings =
        final_salary + encashment.total + gratuity.line.amount + reimbursements_total;
    let total_deductions = final_month_deductions + notice.recovery.amount + advances_total;
    let net_payable = total_earnings - total_deductions;

    if net_payable < Decimal::ZERO {
        trace.warn(AuditWarning::new(
            "NEGATIVE_NET_PAY",
            format!("Settlement recovers {} from the employee", -net_payable),
            WarningSeverity::High,
        ));
    }

    trace.push(AuditStep {
        step_number: trace.next_step(),
        rule_id: "fnf_totals".to_string(),
        rule_name: "Settlement Totals".to_string(),
        reference: "fnf.totals".to_string(),
        input: serde_json::json!({
            "final_salary": final_salary.to_string(),
            "final_month_deductions": final_month_deductions.to_string(),
            "leave_encashment": encashment.total.to_string(),
            "gratuity": gratuity.line.amount.to_string(),
            "notice_recovery": notice.recovery.amount.to_string(),
            "reimbursements": reimbursements_total.to_string(),
            "advances": advances_total.to_string()
        }),
        output: serde_json::json!({
            "total_earnings": total_earnings.to_string(),
            "total_deductions": total_deductions.to_string(),
            "net_payable": net_payable.to_string()
        }),
        reasoning: format!(
            "{} earnings − {} deductions = {} net",
            total_earnings, total_deductions, net_payable
        ),
    });

    let bonus_ids = final_month
        .as_ref()
        .map(|(pay, _, _)| pay.bonus_details.iter().map(|b| b.bonus_id.clone()).collect())
        .unwrap_or_default();

    let breakdown = SalaryBreakdown {
        exit_date: input.exit_date,
        exit_reason: input.exit_reason,
        date_of_joining: input.employee.date_of_joining,
        final_month: final_month.map(|(pay, _, _)| pay),
        leave_encashment: encashment.lines,
        gratuity: gratuity.line.clone(),
        notice: notice.recovery.clone(),
        reimbursements: input.reimbursements.to_vec(),
        advances: input.advances.to_vec(),
        total_earnings,
        total_deductions,
        net_payable,
        audit_trace: trace,
    };

    FnfCalculation {
        final_salary,
        final_month_deductions,
        leave_encashment_amount: encashment.total,
        gratuity_amount: gratuity.line.amount,
        notice_period_recovery: notice.recovery.amount,
        reimbursements_total,
        advances_total,
        bonus_ids,
        breakdown,
    }
}
