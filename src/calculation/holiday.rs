//! Compensation for work on holidays.

use rust_decimal::Decimal;

use crate::config::{HolidayCompensationConfig, HolidayCompensationMode};
use crate::models::AuditStep;

use super::money::round_money;

/// The result of applying the holiday compensation mode.
///
/// At most one of `bonus` and `leave_days` is non-zero.
#[derive(Debug, Clone)]
pub struct HolidayCompensationResult {
    /// Money credit in `bonus` mode.
    pub bonus: Decimal,
    /// Leave days credited in `leave` mode.
    pub leave_days: Decimal,
    /// Category that receives `leave_days`.
    pub leave_category: Option<String>,
    /// The audit step recording the decision.
    pub audit_step: AuditStep,
}

/// Applies the configured mode to the holidays worked in a month.
///
/// In `bonus` mode the credit is `basic / working_days × holidays_worked ×
/// bonus_multiplier`. In `leave` mode `holidays_worked × leaves_per_holiday`
/// days go to the configured category. In `none` mode nothing is produced;
/// the days were already counted as payable.
pub fn calculate_holiday_compensation(
    basic: Decimal,
    working_days: u32,
    holidays_worked: u32,
    config: &HolidayCompensationConfig,
    step_number: u32,
) -> HolidayCompensationResult {
    let worked = Decimal::from(holidays_worked);
    let (bonus, leave_days, reasoning) = match config.mode {
        _ if holidays_worked == 0 => (
            Decimal::ZERO,
            Decimal::ZERO,
            "No holidays worked".to_string(),
        ),
        HolidayCompensationMode::None => (
            Decimal::ZERO,
            Decimal::ZERO,
            format!("{} holiday(s) worked counted as payable days", holidays_worked),
        ),
        HolidayCompensationMode::Bonus if working_days == 0 => (
            Decimal::ZERO,
            Decimal::ZERO,
            "No working days to derive a daily rate".to_string(),
        ),
        HolidayCompensationMode::Bonus => {
            let amount = round_money(
                basic / Decimal::from(working_days) * worked * config.bonus_multiplier,
            );
            (
                amount,
                Decimal::ZERO,
                format!(
                    "{} / {} × {} holiday(s) × {}",
                    basic, working_days, holidays_worked, config.bonus_multiplier
                ),
            )
        }
        HolidayCompensationMode::Leave => {
            let days = worked * config.leaves_per_holiday;
            (
                Decimal::ZERO,
                days,
                format!(
                    "{} holiday(s) × {} day(s) credited to {}",
                    holidays_worked,
                    config.leaves_per_holiday,
                    config.leave_category.as_deref().unwrap_or("-")
                ),
            )
        }
    };

    let leave_category = (leave_days > Decimal::ZERO)
        .then(|| config.leave_category.clone())
        .flatten();

    HolidayCompensationResult {
        bonus,
        leave_days,
        leave_category,
        audit_step: AuditStep {
            step_number,
            rule_id: "holiday_compensation".to_string(),
            rule_name: "Holiday Compensation".to_string(),
            reference: "payroll.holiday_compensation".to_string(),
            input: serde_json::json!({
                "mode": config.mode,
                "holidays_worked": holidays_worked,
                "basic": basic.to_string(),
                "working_days": working_days
            }),
            output: serde_json::json!({
                "holiday_bonus": bonus.to_string(),
                "holiday_leaves_credited": leave_days.to_string()
            }),
            reasoning,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: HolidayCompensationMode) -> HolidayCompensationConfig {
        HolidayCompensationConfig {
            mode,
            bonus_multiplier: Decimal::TWO,
            leaves_per_holiday: Decimal::ONE,
            leave_category: Some("CO".to_string()),
        }
    }

    #[test]
    fn test_bonus_mode() {
        let result = calculate_holiday_compensation(
            Decimal::from(26000),
            26,
            1,
            &config(HolidayCompensationMode::Bonus),
            1,
        );
        assert_eq!(result.bonus, Decimal::from(2000));
        assert_eq!(result.leave_days, Decimal::ZERO);
        assert!(result.leave_category.is_none());
    }

    #[test]
    fn test_leave_mode() {
        let result = calculate_holiday_compensation(
            Decimal::from(26000),
            26,
            2,
            &config(HolidayCompensationMode::Leave),
            1,
        );
        assert_eq!(result.bonus, Decimal::ZERO);
        assert_eq!(result.leave_days, Decimal::TWO);
        assert_eq!(result.leave_category.as_deref(), Some("CO"));
    }

    #[test]
    fn test_none_mode_produces_nothing() {
        let result = calculate_holiday_compensation(
            Decimal::from(26000),
            26,
            2,
            &config(HolidayCompensationMode::None),
            1,
        );
        assert_eq!(result.bonus, Decimal::ZERO);
        assert_eq!(result.leave_days, Decimal::ZERO);
    }
}
