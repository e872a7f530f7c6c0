//! Earning proration by attendance.

use rust_decimal::Decimal;

use crate::models::{
    AuditStep, AuditWarning, EarningComponent, ProratedEarnings, SalaryComponents, WarningSeverity,
};

use super::money::prorate;

/// The result of prorating every earning component.
#[derive(Debug, Clone)]
pub struct ProrationResult {
    /// Prorated components.
    pub earnings: ProratedEarnings,
    /// Set when working days were zero.
    pub warning: Option<AuditWarning>,
    /// The audit step recording the proration.
    pub audit_step: AuditStep,
}

/// Prorates each earning component as `component × payable_days / working_days`.
///
/// Each component is rounded on its own. With zero working days every
/// component is zero and a `ZERO_WORKING_DAYS` warning is returned.
///
/// # Example
///
/// ```
/// use compensation_engine::calculation::prorate_earnings;
/// use compensation_engine::models::SalaryComponents;
/// use rust_decimal::Decimal;
///
/// let components = SalaryComponents { basic: Decimal::from(30000), ..Default::default() };
/// let result = prorate_earnings(&components, Decimal::from(27), 30, 1);
/// assert_eq!(result.earnings.basic, Decimal::from(27000));
/// ```
pub fn prorate_earnings(
    components: &SalaryComponents,
    payable_days: Decimal,
    working_days: u32,
    step_number: u32,
) -> ProrationResult {
    let working = Decimal::from(working_days);
    let p = |component: EarningComponent| prorate(components.earning(component), payable_days, working);

    let earnings = ProratedEarnings {
        basic: p(EarningComponent::Basic),
        hra: p(EarningComponent::Hra),
        conveyance_allowance: p(EarningComponent::Conveyance),
        medical_allowance: p(EarningComponent::Medical),
        special_allowance: p(EarningComponent::Special),
        other_allowances: p(EarningComponent::Other),
    };

    let warning = (working_days == 0).then(|| {
        AuditWarning::new(
            "ZERO_WORKING_DAYS",
            "Month has no working days; earnings prorated to zero",
            WarningSeverity::High,
        )
    });

    let full: serde_json::Map<String, serde_json::Value> = EarningComponent::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), serde_json::json!(components.earning(*c).to_string())))
        .collect();

    let audit_step = AuditStep {
        step_number,
        rule_id: "earnings_proration".to_string(),
        rule_name: "Earnings Proration".to_string(),
        reference: "payroll.proration".to_string(),
        input: serde_json::json!({
            "components": full,
            "payable_days": payable_days.to_string(),
            "working_days": working_days
        }),
        output: serde_json::json!({
            "basic": earnings.basic.to_string(),
            "hra": earnings.hra.to_string(),
            "conveyance_allowance": earnings.conveyance_allowance.to_string(),
            "medical_allowance": earnings.medical_allowance.to_string(),
            "special_allowance": earnings.special_allowance.to_string(),
            "other_allowances": earnings.other_allowances.to_string(),
            "total": earnings.total().to_string()
        }),
        reasoning: if working_days == 0 {
            "No working days in the month, all earnings prorated to 0".to_string()
        } else {
            format!(
                "Each component × {} / {} payable days",
                payable_days, working_days
            )
        },
    };

    ProrationResult {
        earnings,
        warning,
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

    fn components() -> SalaryComponents {
        SalaryComponents {
            basic: dec("30000"),
            hra: dec("12000"),
            conveyance_allowance: dec("1600"),
            special_allowance: dec("4400"),
            ..Default::default()
        }
    }

    #[test]
    fn test_scenario_basic_27000() {
        let result = prorate_earnings(&components(), dec("27"), 30, 2);
        assert_eq!(result.earnings.basic, dec("27000"));
        assert_eq!(result.earnings.hra, dec("10800"));
        assert_eq!(result.earnings.total(), dec("43200"));
        assert!(result.warning.is_none());
        assert_eq!(result.audit_step.step_number, 2);
    }

    #[test]
    fn test_zero_working_days_warns() {
        let result = prorate_earnings(&components(), dec("5"), 0, 1);
        assert_eq!(result.earnings.total(), Decimal::ZERO);
        assert_eq!(result.warning.unwrap().code, "ZERO_WORKING_DAYS");
    }
}
