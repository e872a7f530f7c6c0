//! Leave accrual: joining pro-rata, periodic credits and carry-forward.
//!
//! Every allocation uses the same rounding policy: floor to whole days, or
//! one decimal place when the calendar allows fractional credits.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::{CalendarSettings, CreditFrequency, LeaveCategoryConfig};
use crate::models::{AuditStep, CreditSource, FinancialYear, LeaveBalance, PayrollPeriod};

const MONTHS_PER_YEAR: u32 = 12;
const QUARTERS_PER_YEAR: u32 = 4;

/// Applies the calendar's rounding policy to a raw day count.
pub fn round_leave_days(raw: Decimal, allow_fractional: bool) -> Decimal {
    if allow_fractional {
        raw.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    } else {
        raw.floor()
    }
}

/// Fraction of the joining month that earns leave.
///
/// Joining on the cutoff day itself falls under `before_cutoff`.
pub fn first_month_fraction(date_of_joining: NaiveDate, calendar: &CalendarSettings) -> Decimal {
    if date_of_joining.day() <= calendar.joining_cutoff_day {
        calendar.mid_month_join_policy.before_cutoff.fraction()
    } else {
        calendar.mid_month_join_policy.after_cutoff.fraction()
    }
}

/// The result of a joining pro-rata computation.
#[derive(Debug, Clone)]
pub struct JoiningCreditResult {
    /// Days to credit after rounding.
    pub days: Decimal,
    /// Whole months in the financial year after the joining month.
    pub months_remaining: u32,
    /// Fraction credited for the joining month.
    pub first_month_fraction: Decimal,
    /// Provenance note stored on the balance.
    pub notes: String,
    /// The audit step recording the computation.
    pub audit_step: AuditStep,
}

/// Computes the joining credit for one category.
///
/// Monthly categories get `quota × fraction / 12`; others get
/// `quota × (months_remaining + fraction) / 12`.
pub fn calculate_joining_credit(
    date_of_joining: NaiveDate,
    calendar: &CalendarSettings,
    category: &LeaveCategoryConfig,
    step_number: u32,
) -> JoiningCreditResult {
    let financial_year = calendar.financial_year(date_of_joining);
    let months_remaining = financial_year.months_remaining_after(date_of_joining);
    let fraction = first_month_fraction(date_of_joining, calendar);
    let twelve = Decimal::from(MONTHS_PER_YEAR);

    let raw = match category.credit_frequency {
        CreditFrequency::Monthly => category.annual_quota * fraction / twelve,
        CreditFrequency::Quarterly | CreditFrequency::Yearly | CreditFrequency::ProRata => {
            category.annual_quota * (Decimal::from(months_remaining) + fraction) / twelve
        }
    };
    let days = round_leave_days(raw, calendar.allow_fractional);

    let notes = format!(
        "Joining credit for {} ({}): joined {}, {} month(s) remaining + {} of joining month, {} of {} annual days",
        category.name,
        financial_year.label(),
        date_of_joining,
        months_remaining,
        fraction.normalize(),
        days.normalize(),
        category.annual_quota.normalize()
    );

    let audit_step = AuditStep {
        step_number,
        rule_id: "leave_joining_credit".to_string(),
        rule_name: "Leave Joining Credit".to_string(),
        reference: "leave.calendar_settings.mid_month_join_policy".to_string(),
        input: serde_json::json!({
            "category": category.code,
            "annual_quota": category.annual_quota.to_string(),
            "credit_frequency": category.credit_frequency,
            "date_of_joining": date_of_joining.to_string(),
            "joining_cutoff_day": calendar.joining_cutoff_day,
            "allow_fractional": calendar.allow_fractional
        }),
        output: serde_json::json!({
            "financial_year": financial_year.label(),
            "months_remaining": months_remaining,
            "first_month_fraction": fraction.to_string(),
            "raw_days": raw.to_string(),
            "days": days.to_string()
        }),
        reasoning: notes.clone(),
    };

    JoiningCreditResult {
        days,
        months_remaining,
        first_month_fraction: fraction,
        notes,
        audit_step,
    }
}

/// The result of a periodic accrual for one category and month.
#[derive(Debug, Clone)]
pub struct PeriodicCreditResult {
    /// Ledger source tag for the credit.
    pub source: CreditSource,
    /// Days to credit after rounding.
    pub days: Decimal,
    /// Provenance note stored on the balance.
    pub notes: String,
    /// The audit step recording the computation.
    pub audit_step: AuditStep,
}

/// Computes the periodic credit due for `period`, if any.
///
/// Monthly categories earn `quota / 12` every month, quarterly categories
/// `quota / 4` in the first month of each quarter of the financial year, and
/// yearly and pro-rata categories their full quota in its first month.
///
/// Nothing is due before the month after joining. In the joining financial
/// year only monthly categories accrue, since the joining credit already
/// covers the rest of that year for every other frequency.
pub fn calculate_periodic_credit(
    category: &LeaveCategoryConfig,
    calendar: &CalendarSettings,
    financial_year: FinancialYear,
    period: PayrollPeriod,
    date_of_joining: NaiveDate,
    step_number: u32,
) -> Option<PeriodicCreditResult> {
    if date_of_joining >= period.first_day() {
        return None;
    }
    let joining_year = calendar.financial_year(date_of_joining) == financial_year;
    if joining_year && category.credit_frequency != CreditFrequency::Monthly {
        return None;
    }
    let position = financial_year.month_position(period.month);
    let (source, raw) = match category.credit_frequency {
        CreditFrequency::Monthly => (
            CreditSource::MonthlyAccrual,
            category.annual_quota / Decimal::from(MONTHS_PER_YEAR),
        ),
        CreditFrequency::Quarterly if position % 3 == 1 => (
            CreditSource::QuarterlyAccrual,
            category.annual_quota / Decimal::from(QUARTERS_PER_YEAR),
        ),
        CreditFrequency::Yearly | CreditFrequency::ProRata if position == 1 => {
            (CreditSource::AnnualCredit, category.annual_quota)
        }
        _ => return None,
    };
    let days = round_leave_days(raw, calendar.allow_fractional);
    let notes = format!(
        "{} for {} ({}): {} day(s)",
        source.as_str(),
        category.name,
        period,
        days.normalize()
    );

    Some(PeriodicCreditResult {
        source,
        days,
        audit_step: AuditStep {
            step_number,
            rule_id: "leave_periodic_accrual".to_string(),
            rule_name: "Leave Periodic Accrual".to_string(),
            reference: "leave.categories.credit_frequency".to_string(),
            input: serde_json::json!({
                "category": category.code,
                "annual_quota": category.annual_quota.to_string(),
                "credit_frequency": category.credit_frequency,
                "period": period.to_string(),
                "date_of_joining": date_of_joining.to_string(),
                "fy_position": position
            }),
            output: serde_json::json!({
                "source": source,
                "days": days.to_string()
            }),
            reasoning: notes.clone(),
        },
        notes,
    })
}

/// The result of a carry-forward computation.
#[derive(Debug, Clone)]
pub struct CarryForwardResult {
    /// Days moved into the next financial year.
    pub days: Decimal,
    /// Unused days at year end.
    pub available: Decimal,
    /// Provenance note stored on the next year's balance.
    pub notes: String,
    /// The audit step recording the computation.
    pub audit_step: AuditStep,
}

/// Computes how many unused days move into the next financial year.
///
/// Returns `None` when the category does not carry forward. A negative
/// balance carries nothing.
pub fn calculate_carry_forward(
    balance: &LeaveBalance,
    category: &LeaveCategoryConfig,
    next_financial_year: &str,
    step_number: u32,
) -> Option<CarryForwardResult> {
    if !category.carry_forward.enabled {
        return None;
    }
    let available = balance.available();
    let unused = available.max(Decimal::ZERO);
    let days = match category.carry_forward.max_days {
        Some(cap) => unused.min(cap),
        None => unused,
    };
    let notes = format!(
        "Carried forward {} of {} unused {} day(s) from {}",
        days.normalize(),
        available.normalize(),
        category.code,
        balance.financial_year
    );

    Some(CarryForwardResult {
        days,
        available,
        audit_step: AuditStep {
            step_number,
            rule_id: "leave_carry_forward".to_string(),
            rule_name: "Leave Carry Forward".to_string(),
            reference: "leave.categories.carry_forward".to_string(),
            input: serde_json::json!({
                "category": category.code,
                "from_financial_year": balance.financial_year,
                "to_financial_year": next_financial_year,
                "available": available.to_string(),
                "max_days": category.carry_forward.max_days.map(|d| d.to_string())
            }),
            output: serde_json::json!({ "days": days.to_string() }),
            reasoning: notes.clone(),
        },
        notes,
    })
}
