//! Payable day derivation from a monthly attendance summary.

use rust_decimal::Decimal;

use crate::config::HolidayCompensationMode;
use crate::models::{AttendanceCounts, AttendanceSummary, AuditStep, AuditWarning, WarningSeverity};

/// The result of deriving working and payable days.
#[derive(Debug, Clone)]
pub struct PayableDaysResult {
    /// Counts as stored on the payroll record.
    pub counts: AttendanceCounts,
    /// Non-fatal findings.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording this derivation.
    pub audit_step: AuditStep,
}

/// Derives working and payable days for one month.
///
/// `working_days = total_days − holidays − weekoffs`. Payable days are
/// present days, half days at one half, and paid leave; holidays worked are
/// added only when they are not compensated separately. Payable days never
/// exceed working days.
pub fn calculate_payable_days(
    summary: &AttendanceSummary,
    holiday_mode: HolidayCompensationMode,
    step_number: u32,
) -> PayableDaysResult {
    let mut warnings = Vec::new();
    let working_days = summary.derived_working_days();

    if summary.working_days != 0 && summary.working_days != working_days {
        warnings.push(AuditWarning::new(
            "WORKING_DAYS_MISMATCH",
            format!(
                "Aggregator reported {} working days, derived {}",
                summary.working_days, working_days
            ),
            WarningSeverity::Low,
        ));
    }

    let holiday_adjustment = match holiday_mode {
        HolidayCompensationMode::None => Decimal::from(summary.holidays_worked),
        HolidayCompensationMode::Bonus | HolidayCompensationMode::Leave => Decimal::ZERO,
    };

    let uncapped = summary.attended_days() + summary.paid_leave_days + holiday_adjustment;
    let working = Decimal::from(working_days);
    let payable_days = if uncapped > working {
        warnings.push(AuditWarning::new(
            "PAYABLE_DAYS_CAPPED",
            format!("Payable days {} capped at {} working days", uncapped, working),
            WarningSeverity::Medium,
        ));
        working
    } else {
        uncapped
    };

    let counts = AttendanceCounts {
        total_days: summary.total_days,
        working_days,
        present_days: summary.present_days,
        absent_days: summary.absent_days,
        paid_leave_days: summary.paid_leave_days,
        unpaid_leave_days: summary.unpaid_leave_days,
        holidays: summary.holidays,
        holidays_worked: summary.holidays_worked,
        weekoffs: summary.weekoffs,
        half_days: summary.half_days,
        payable_days,
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "payable_days".to_string(),
        rule_name: "Payable Days".to_string(),
        reference: "attendance.payable_days".to_string(),
        input: serde_json::json!({
            "total_days": summary.total_days,
            "holidays": summary.holidays,
            "weekoffs": summary.weekoffs,
            "present_days": summary.present_days,
            "half_days": summary.half_days,
            "paid_leave_days": summary.paid_leave_days.to_string(),
            "holidays_worked": summary.holidays_worked,
            "holiday_mode": holiday_mode
        }),
        output: serde_json::json!({
            "working_days": working_days,
            "payable_days": payable_days.to_string()
        }),
        reasoning: format!(
            "{} present + {} half days + {} paid leave + {} holiday adjustment = {} payable of {} working",
            summary.present_days,
            summary.half_days,
            summary.paid_leave_days,
            holiday_adjustment,
            payable_days,
            working_days
        ),
    };

    PayableDaysResult {
        counts,
        warnings,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn summary() -> AttendanceSummary {
        AttendanceSummary {
            total_days: 30,
            working_days: 30,
            present_days: 25,
            paid_leave_days: dec("2"),
            ..Default::default()
        }
    }

    #[test]
    fn test_present_plus_paid_leave() {
        let result = calculate_payable_days(&summary(), HolidayCompensationMode::Bonus, 1);
        assert_eq!(result.counts.working_days, 30);
        assert_eq!(result.counts.payable_days, dec("27"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_holidays_worked_count_only_without_compensation() {
        let mut s = summary();
        s.total_days = 31;
        s.working_days = 30;
        s.holidays = 1;
        s.holidays_worked = 1;
        let none = calculate_payable_days(&s, HolidayCompensationMode::None, 1);
        let bonus = calculate_payable_days(&s, HolidayCompensationMode::Bonus, 1);
        assert_eq!(none.counts.payable_days, dec("28"));
        assert_eq!(bonus.counts.payable_days, dec("27"));
    }

    #[test]
    fn test_half_days_and_cap() {
        let s = AttendanceSummary {
            total_days: 30,
            weekoffs: 4,
            present_days: 25,
            half_days: 2,
            paid_leave_days: dec("1"),
            ..Default::default()
        };
        let result = calculate_payable_days(&s, HolidayCompensationMode::None, 1);
        assert_eq!(result.counts.working_days, 26);
        assert_eq!(result.counts.payable_days, dec("26"));
        assert!(result.warnings.iter().any(|w| w.code == "PAYABLE_DAYS_CAPPED"));
    }

    #[test]
    fn test_working_day_mismatch_is_flagged() {
        let mut s = summary();
        s.working_days = 26;
        let result = calculate_payable_days(&s, HolidayCompensationMode::Bonus, 1);
        assert_eq!(result.counts.working_days, 30);
        assert_eq!(result.warnings[0].code, "WORKING_DAYS_MISMATCH");
    }
}
