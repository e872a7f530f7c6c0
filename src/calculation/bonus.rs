//! Bonus aggregation for a payroll period.

use rust_decimal::Decimal;

use crate::models::{AuditStep, Bonus, BonusDetail, BonusStatus, PayrollPeriod};

/// The result of aggregating bonuses.
#[derive(Debug, Clone)]
pub struct BonusAggregation {
    /// Sum of the itemized bonuses.
    pub total: Decimal,
    /// One line per bonus, ordered by bonus id.
    pub details: Vec<BonusDetail>,
    /// The audit step recording the aggregation.
    pub audit_step: AuditStep,
}

/// Sums the pending bonuses of `period` that are free or already reserved by
/// `payroll_id`.
///
/// A bonus reserved by another payroll record is never counted twice.
pub fn aggregate_bonuses(
    bonuses: &[Bonus],
    period: PayrollPeriod,
    payroll_id: Option<&str>,
    step_number: u32,
) -> BonusAggregation {
    let mut eligible: Vec<&Bonus> = bonuses
        .iter()
        .filter(|b| b.applies_to(period) && b.status == BonusStatus::Pending)
        .filter(|b| match (&b.consumed_by, payroll_id) {
            (None, _) => true,
            (Some(owner), Some(id)) => owner == id,
            (Some(_), None) => false,
        })
        .collect();
    eligible.sort_by(|a, b| a.id.cmp(&b.id));

    let details: Vec<BonusDetail> = eligible
        .iter()
        .map(|b| BonusDetail {
            bonus_id: b.id.clone(),
            amount: b.amount,
            reason: b.reason.clone(),
        })
        .collect();
    let total: Decimal = details.iter().map(|d| d.amount).sum();

    let audit_step = AuditStep {
        step_number,
        rule_id: "bonus_aggregation".to_string(),
        rule_name: "Bonus Aggregation".to_string(),
        reference: "payroll.bonus".to_string(),
        input: serde_json::json!({
            "period": period.to_string(),
            "candidates": bonuses.len()
        }),
        output: serde_json::json!({
            "bonus_ids": details.iter().map(|d| d.bonus_id.clone()).collect::<Vec<_>>(),
            "total_bonus": total.to_string()
        }),
        reasoning: format!("{} pending bonus(es) for {} totalling {}", details.len(), period, total),
    };

    BonusAggregation {
        total,
        details,
        audit_step,
    }
}
