//! Notice period recovery.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::NoticeConfig;
use crate::models::{AuditStep, ExitReason, NoticeRecovery};

use super::money::round_money;

/// The result of a notice recovery computation.
#[derive(Debug, Clone)]
pub struct NoticeRecoveryResult {
    /// The breakdown line.
    pub recovery: NoticeRecovery,
    /// The audit step recording the computation.
    pub audit_step: AuditStep,
}

/// Recovers `daily_salary × shortfall_days` when a resignation served less
/// than the required notice and no waiver applies.
///
/// Days served run from the resignation date to the exit date. A resignation
/// without a recorded resignation date is treated as zero days served. Other
/// exit reasons owe no notice.
pub fn calculate_notice_recovery(
    exit_reason: ExitReason,
    resignation_date: Option<NaiveDate>,
    exit_date: NaiveDate,
    daily_salary: Decimal,
    config: &NoticeConfig,
    waiver_granted: bool,
    step_number: u32,
) -> NoticeRecoveryResult {
    let applies = exit_reason.is_voluntary();
    let required_days = if applies { config.period_days } else { 0 };
    let served_days = resignation_date
        .map(|r| (exit_date - r).num_days().max(0) as u32)
        .unwrap_or(0);
    let shortfall_days = required_days.saturating_sub(served_days);
    let waived = config.waiver_allowed || waiver_granted;

    let amount = if applies && !waived {
        round_money(daily_salary * Decimal::from(shortfall_days))
    } else {
        Decimal::ZERO
    };

    let reasoning = if !applies {
        format!("No notice owed on {:?} exit", exit_reason)
    } else if shortfall_days == 0 {
        format!("Served {} of {} notice days", served_days, required_days)
    } else if waived {
        format!("Shortfall of {} day(s) waived", shortfall_days)
    } else {
        format!(
            "Shortfall of {} day(s) × {} daily salary = {}",
            shortfall_days, daily_salary, amount
        )
    };

    NoticeRecoveryResult {
        recovery: NoticeRecovery {
            required_days,
            served_days,
            shortfall_days,
            daily_salary,
            waived: applies && shortfall_days > 0 && waived,
            amount,
        },
        audit_step: AuditStep {
            step_number,
            rule_id: "notice_recovery".to_string(),
            rule_name: "Notice Period Recovery".to_string(),
            reference: "fnf.settings.notice".to_string(),
            input: serde_json::json!({
                "exit_reason": exit_reason,
                "resignation_date": resignation_date.map(|d| d.to_string()),
                "exit_date": exit_date.to_string(),
                "period_days": config.period_days,
                "waiver_allowed": config.waiver_allowed,
                "waiver_granted": waiver_granted
            }),
            output: serde_json::json!({
                "shortfall_days": shortfall_days,
                "amount": amount.to_string()
            }),
            reasoning,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(waiver_allowed: bool) -> NoticeConfig {
        NoticeConfig {
            period_days: 30,
            waiver_allowed,
        }
    }

    #[test]
    fn test_short_notice_is_recovered() {
        let result = calculate_notice_recovery(
            ExitReason::Resignation,
            Some(date(2025, 9, 10)),
            date(2025, 9, 30),
            Decimal::from(1000),
            &config(false),
            false,
            1,
        );
        assert_eq!(result.recovery.served_days, 20);
        assert_eq!(result.recovery.shortfall_days, 10);
        assert_eq!(result.recovery.amount, Decimal::from(10000));
    }

    #[test]
    fn test_waivers() {
        for (allowed, granted) in [(true, false), (false, true)] {
            let result = calculate_notice_recovery(
                ExitReason::Resignation,
                Some(date(2025, 9, 10)),
                date(2025, 9, 30),
                Decimal::from(1000),
                &config(allowed),
                granted,
                1,
            );
            assert_eq!(result.recovery.amount, Decimal::ZERO);
            assert!(result.recovery.waived);
        }
    }

    #[test]
    fn test_termination_owes_nothing() {
        let result = calculate_notice_recovery(
            ExitReason::Termination,
            None,
            date(2025, 9, 30),
            Decimal::from(1000),
            &config(false),
            false,
            1,
        );
        assert_eq!(result.recovery.required_days, 0);
        assert_eq!(result.recovery.amount, Decimal::ZERO);
    }
}
