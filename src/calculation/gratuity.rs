//! Gratuity on exit.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::config::GratuityConfig;
use crate::models::{AuditStep, GratuityLine};

use super::money::round_money;

/// Completed years and leftover months between joining and exit.
pub fn service_period(date_of_joining: NaiveDate, exit_date: NaiveDate) -> (u32, u32) {
    if exit_date <= date_of_joining {
        return (0, 0);
    }
    let mut months = (exit_date.year() - date_of_joining.year()) * 12
        + exit_date.month() as i32
        - date_of_joining.month() as i32;
    if exit_date.day() < date_of_joining.day() {
        months -= 1;
    }
    let months = months.max(0) as u32;
    (months / 12, months % 12)
}

/// Service years counted for gratuity: completed years, plus one when the
/// leftover months reach `round_up_after_months`.
pub fn service_years(
    date_of_joining: NaiveDate,
    exit_date: NaiveDate,
    round_up_after_months: Option<u32>,
) -> u32 {
    let (years, months) = service_period(date_of_joining, exit_date);
    match round_up_after_months {
        Some(threshold) if months >= threshold => years + 1,
        _ => years,
    }
}

/// The result of a gratuity computation.
#[derive(Debug, Clone)]
pub struct GratuityResult {
    /// The breakdown line.
    pub line: GratuityLine,
    /// The audit step recording the computation.
    pub audit_step: AuditStep,
}

/// `basic × days_per_year / divisor × service_years`, capped by
/// `max_amount`, paid only when service years reach `min_service_years`.
pub fn calculate_gratuity(
    basic: Decimal,
    date_of_joining: NaiveDate,
    exit_date: NaiveDate,
    config: &GratuityConfig,
    step_number: u32,
) -> GratuityResult {
    let years = service_years(date_of_joining, exit_date, config.round_up_after_months);
    let eligible = years >= config.min_service_years;

    let uncapped = if eligible && !config.divisor.is_zero() {
        round_money(basic * config.days_per_year / config.divisor * Decimal::from(years))
    } else {
        Decimal::ZERO
    };
    let (amount, capped) = match config.max_amount {
        Some(max) if uncapped > max => (max, true),
        _ => (uncapped, false),
    };

    let reasoning = if eligible {
        format!(
            "{} × {} / {} × {} year(s) = {}{}",
            basic,
            config.days_per_year,
            config.divisor,
            years,
            uncapped,
            if capped { " (capped)" } else { "" }
        )
    } else {
        format!(
            "{} year(s) of service is below the {} year minimum",
            years, config.min_service_years
        )
    };

    GratuityResult {
        line: GratuityLine {
            eligible,
            service_years: years,
            basic,
            amount,
            capped,
        },
        audit_step: AuditStep {
            step_number,
            rule_id: "gratuity".to_string(),
            rule_name: "Gratuity".to_string(),
            reference: "fnf.settings.gratuity".to_string(),
            input: serde_json::json!({
                "basic": basic.to_string(),
                "date_of_joining": date_of_joining.to_string(),
                "exit_date": exit_date.to_string(),
                "min_service_years": config.min_service_years,
                "days_per_year": config.days_per_year.to_string(),
                "divisor": config.divisor.to_string(),
                "max_amount": config.max_amount.map(|m| m.to_string())
            }),
            output: serde_json::json!({
                "service_years": years,
                "eligible": eligible,
                "amount": amount.to_string(),
                "capped": capped
            }),
            reasoning,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> GratuityConfig {
        GratuityConfig {
            min_service_years: 5,
            days_per_year: dec("15"),
            divisor: dec("26"),
            max_amount: Some(dec("2000000")),
            round_up_after_months: Some(6),
        }
    }

    #[test]
    fn test_service_period() {
        assert_eq!(service_period(date(2018, 3, 10), date(2025, 3, 9)), (6, 11));
        assert_eq!(service_period(date(2018, 3, 10), date(2025, 3, 10)), (7, 0));
        assert_eq!(service_period(date(2025, 3, 10), date(2024, 1, 1)), (0, 0));
    }

    #[test]
    fn test_round_up_after_months() {
        assert_eq!(service_years(date(2020, 1, 1), date(2024, 7, 1), Some(6)), 5);
        assert_eq!(service_years(date(2020, 1, 1), date(2024, 6, 30), Some(6)), 4);
        assert_eq!(service_years(date(2020, 1, 1), date(2024, 7, 1), None), 4);
    }

    #[test]
    fn test_gratuity_formula() {
        // 26000 × 15 / 26 × 5 = 75000
        let result = calculate_gratuity(dec("26000"), date(2020, 1, 1), date(2025, 1, 1), &config(), 1);
        assert!(result.line.eligible);
        assert_eq!(result.line.service_years, 5);
        assert_eq!(result.line.amount, dec("75000"));
        assert!(!result.line.capped);
    }

    #[test]
    fn test_below_minimum_is_zero() {
        let result = calculate_gratuity(dec("26000"), date(2022, 1, 1), date(2025, 1, 1), &config(), 1);
        assert!(!result.line.eligible);
        assert_eq!(result.line.amount, Decimal::ZERO);
    }

    #[test]
    fn test_cap_applies() {
        let mut config = config();
        config.max_amount = Some(dec("50000"));
        let result = calculate_gratuity(dec("26000"), date(2020, 1, 1), date(2025, 1, 1), &config, 1);
        assert_eq!(result.line.amount, dec("50000"));
        assert!(result.line.capped);
    }
}
