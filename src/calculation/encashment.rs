//! Leave encashment on exit.

use rust_decimal::Decimal;

use crate::config::{EncashmentConfig, LeaveCategoryConfig};
use crate::models::{AuditStep, EncashmentLine, LeaveBalance};

use super::money::{per_day, round_money};

/// The result of a leave encashment computation.
#[derive(Debug, Clone)]
pub struct EncashmentResult {
    /// One line per encashable category with a positive balance.
    pub lines: Vec<EncashmentLine>,
    /// Sum of line amounts.
    pub total: Decimal,
    /// Daily salary used for every line.
    pub daily_rate: Decimal,
    /// The audit step recording the computation.
    pub audit_step: AuditStep,
}

/// Pays out unused days of encashable categories at `basic / daily_divisor`.
///
/// Days are `min(available, max_encashable_days)` and never negative.
/// Lines are ordered by category code.
pub fn calculate_leave_encashment(
    basic: Decimal,
    balances: &[LeaveBalance],
    categories: &[LeaveCategoryConfig],
    config: &EncashmentConfig,
    step_number: u32,
) -> EncashmentResult {
    let daily_rate = per_day(basic, config.daily_divisor);

    let mut lines: Vec<EncashmentLine> = balances
        .iter()
        .filter_map(|balance| {
            let category = categories
                .iter()
                .find(|c| c.code == balance.category && c.encashable)?;
            let available = balance.available().max(Decimal::ZERO);
            let days = match category.max_encashable_days {
                Some(cap) => available.min(cap),
                None => available,
            };
            (days > Decimal::ZERO).then(|| EncashmentLine {
                category: balance.category.clone(),
                financial_year: balance.financial_year.clone(),
                days,
                daily_rate,
                amount: round_money(daily_rate * days),
            })
        })
        .collect();
    lines.sort_by(|a, b| a.category.cmp(&b.category));

    let total: Decimal = lines.iter().map(|l| l.amount).sum();

    let audit_step = AuditStep {
        step_number,
        rule_id: "leave_encashment".to_string(),
        rule_name: "Leave Encashment".to_string(),
        reference: "fnf.settings.encashment".to_string(),
        input: serde_json::json!({
            "basic": basic.to_string(),
            "daily_divisor": config.daily_divisor.to_string(),
            "balances": balances
                .iter()
                .map(|b| serde_json::json!({
                    "category": b.category,
                    "available": b.available().to_string()
                }))
                .collect::<Vec<_>>()
        }),
        output: serde_json::json!({
            "daily_rate": daily_rate.to_string(),
            "lines": lines
                .iter()
                .map(|l| serde_json::json!({
                    "category": l.category,
                    "days": l.days.to_string(),
                    "amount": l.amount.to_string()
                }))
                .collect::<Vec<_>>(),
            "total": total.to_string()
        }),
        reasoning: format!(
            "{} encashable categor{} at {} per day = {}",
            lines.len(),
            if lines.len() == 1 { "y" } else { "ies" },
            daily_rate,
            total
        ),
    };

    EncashmentResult {
        lines,
        total,
        daily_rate,
        audit_step,
    }
}
