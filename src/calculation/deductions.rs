//! Statutory deductions and loss of pay.
//!
//! PF, ESIC, professional tax and TDS are not prorated by attendance. They
//! come either from the salary structure or from configured percentages of
//! prorated pay. Loss of pay is a separate deduction driven by unpaid leave.

use rust_decimal::Decimal;

use crate::config::{DeductionBasis, StatutoryConfig};
use crate::models::{AuditStep, Deductions, ProratedEarnings, SalaryComponents};

use super::money::{percentage_of, per_day, round_money};

/// The result of computing statutory deductions.
#[derive(Debug, Clone)]
pub struct StatutoryDeductionResult {
    /// Deductions with `lop_deduction` left at zero.
    pub deductions: Deductions,
    /// Whether prorated gross was within the ESIC limit.
    pub esic_applicable: bool,
    /// The audit step recording the computation.
    pub audit_step: AuditStep,
}

/// Computes PF, ESIC, professional tax and TDS for one month.
///
/// ESIC applies only while prorated gross is at or below
/// `esic_gross_limit`; with no limit configured it always applies.
pub fn calculate_statutory_deductions(
    components: &SalaryComponents,
    earnings: &ProratedEarnings,
    config: &StatutoryConfig,
    step_number: u32,
) -> StatutoryDeductionResult {
    let gross_prorated = earnings.total();
    let esic_applicable = config
        .esic_gross_limit
        .is_none_or(|limit| gross_prorated <= limit);

    let (employee_pf, employer_pf, esic, pf_wages) = match config.deduction_basis {
        DeductionBasis::Structure => (
            components.employee_pf,
            components.employer_pf,
            if esic_applicable {
                components.esic
            } else {
                Decimal::ZERO
            },
            None,
        ),
        DeductionBasis::Percentage => {
            let pf_wages = match config.pf_wage_ceiling {
                Some(ceiling) => earnings.basic.min(ceiling),
                None => earnings.basic,
            };
            let esic = if esic_applicable {
                percentage_of(gross_prorated, config.esic_employee_percentage)
            } else {
                Decimal::ZERO
            };
            (
                percentage_of(pf_wages, config.pf_employee_percentage),
                percentage_of(pf_wages, config.pf_employer_percentage),
                esic,
                Some(pf_wages),
            )
        }
    };

    let deductions = Deductions {
        employee_pf,
        employer_pf,
        esic,
        professional_tax: config.professional_tax.unwrap_or(components.professional_tax),
        tds: components.tds,
        lop_deduction: Decimal::ZERO,
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "statutory_deductions".to_string(),
        rule_name: "Statutory Deductions".to_string(),
        reference: "payroll.statutory".to_string(),
        input: serde_json::json!({
            "deduction_basis": config.deduction_basis,
            "gross_prorated": gross_prorated.to_string(),
            "basic_prorated": earnings.basic.to_string(),
            "pf_wages": pf_wages.map(|w| w.to_string()),
            "pf_employee_percentage": config.pf_employee_percentage.to_string(),
            "esic_employee_percentage": config.esic_employee_percentage.to_string(),
            "esic_gross_limit": config.esic_gross_limit.map(|l| l.to_string())
        }),
        output: serde_json::json!({
            "employee_pf": deductions.employee_pf.to_string(),
            "employer_pf": deductions.employer_pf.to_string(),
            "esic": deductions.esic.to_string(),
            "esic_applicable": esic_applicable,
            "professional_tax": deductions.professional_tax.to_string(),
            "tds": deductions.tds.to_string()
        }),
        reasoning: match config.esic_gross_limit {
            Some(limit) if !esic_applicable => format!(
                "Prorated gross {} exceeds ESIC limit {}, ESIC not deducted",
                gross_prorated, limit
            ),
            _ => format!(
                "Deductions from {:?} basis on prorated gross {}",
                config.deduction_basis, gross_prorated
            ),
        },
    };

    StatutoryDeductionResult {
        deductions,
        esic_applicable,
        audit_step,
    }
}

/// The result of a loss-of-pay computation.
#[derive(Debug, Clone)]
pub struct LossOfPayResult {
    /// The deduction.
    pub amount: Decimal,
    /// The audit step recording the computation.
    pub audit_step: AuditStep,
}

/// `lop = (basic / working_days) × unpaid_leave_days`, zero when disabled or
/// when there are no working days.
pub fn calculate_loss_of_pay(
    basic: Decimal,
    working_days: u32,
    unpaid_leave_days: Decimal,
    enabled: bool,
    step_number: u32,
) -> LossOfPayResult {
    let daily = per_day(basic, Decimal::from(working_days));
    let amount = if enabled && working_days > 0 {
        round_money(basic * unpaid_leave_days / Decimal::from(working_days))
    } else {
        Decimal::ZERO
    };

    LossOfPayResult {
        amount,
        audit_step: AuditStep {
            step_number,
            rule_id: "loss_of_pay".to_string(),
            rule_name: "Loss of Pay".to_string(),
            reference: "payroll.lop".to_string(),
            input: serde_json::json!({
                "basic": basic.to_string(),
                "working_days": working_days,
                "unpaid_leave_days": unpaid_leave_days.to_string(),
                "enabled": enabled
            }),
            output: serde_json::json!({
                "daily_basic": daily.to_string(),
                "lop_deduction": amount.to_string()
            }),
            reasoning: if enabled {
                format!("{} / {} × {} unpaid days", basic, working_days, unpaid_leave_days)
            } else {
                "Loss of pay deduction disabled".to_string()
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn percentage_config() -> StatutoryConfig {
        StatutoryConfig {
            deduction_basis: DeductionBasis::Percentage,
            pf_employee_percentage: dec("12"),
            pf_employer_percentage: dec("12"),
            pf_wage_ceiling: Some(dec("15000")),
            esic_employee_percentage: dec("0.75"),
            esic_gross_limit: Some(dec("21000")),
            professional_tax: Some(dec("200")),
            apply_lop_deduction: true,
        }
    }

    fn earnings(basic: &str, hra: &str) -> ProratedEarnings {
        ProratedEarnings {
            basic: dec(basic),
            hra: dec(hra),
            ..Default::default()
        }
    }

    #[test]
    fn test_pf_capped_at_wage_ceiling() {
        let result = calculate_statutory_deductions(
            &SalaryComponents::default(),
            &earnings("27000", "10800"),
            &percentage_config(),
            1,
        );
        assert_eq!(result.deductions.employee_pf, dec("1800"));
        assert_eq!(result.deductions.employer_pf, dec("1800"));
        assert_eq!(result.deductions.esic, Decimal::ZERO);
        assert!(!result.esic_applicable);
    }

    #[test]
    fn test_esic_at_limit_is_included() {
        let result = calculate_statutory_deductions(
            &SalaryComponents::default(),
            &earnings("14000", "7000"),
            &percentage_config(),
            1,
        );
        assert!(result.esic_applicable);
        assert_eq!(result.deductions.esic, dec("157.50"));
        assert_eq!(result.deductions.employee_pf, dec("1680"));
    }

    #[test]
    fn test_esic_one_unit_above_limit_is_excluded() {
        let result = calculate_statutory_deductions(
            &SalaryComponents::default(),
            &earnings("14000", "7001"),
            &percentage_config(),
            1,
        );
        assert!(!result.esic_applicable);
        assert_eq!(result.deductions.esic, Decimal::ZERO);
    }

    #[test]
    fn test_structure_basis_uses_structure_amounts() {
        let config = StatutoryConfig {
            deduction_basis: DeductionBasis::Structure,
            professional_tax: None,
            ..percentage_config()
        };
        let components = SalaryComponents {
            basic: dec("10000"),
            employee_pf: dec("1200"),
            employer_pf: dec("1300"),
            esic: dec("75"),
            tds: dec("500"),
            professional_tax: dec("150"),
            ..Default::default()
        };
        let result =
            calculate_statutory_deductions(&components, &earnings("5000", "0"), &config, 1);
        assert_eq!(result.deductions.employee_pf, dec("1200"));
        assert_eq!(result.deductions.employer_pf, dec("1300"));
        assert_eq!(result.deductions.esic, dec("75"));
        assert_eq!(result.deductions.professional_tax, dec("150"));
        assert_eq!(result.deductions.tds, dec("500"));
    }

    #[test]
    fn test_uncapped_pf_without_ceiling() {
        let config = StatutoryConfig {
            pf_wage_ceiling: None,
            ..percentage_config()
        };
        let result = calculate_statutory_deductions(
            &SalaryComponents::default(),
            &earnings("30000", "0"),
            &config,
            1,
        );
        assert_eq!(result.deductions.employee_pf, dec("3600"));
    }

    #[test]
    fn test_loss_of_pay() {
        let result = calculate_loss_of_pay(dec("26000"), 26, dec("2"), true, 4);
        assert_eq!(result.amount, dec("2000"));
        let disabled = calculate_loss_of_pay(dec("26000"), 26, dec("2"), false, 4);
        assert_eq!(disabled.amount, Decimal::ZERO);
        let no_days = calculate_loss_of_pay(dec("26000"), 0, dec("2"), true, 4);
        assert_eq!(no_days.amount, Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn prop_esic_boundary(limit in 1_000i64..50_000, delta_cents in -500i64..500) {
            let config = StatutoryConfig {
                esic_gross_limit: Some(Decimal::from(limit)),
                ..percentage_config()
            };
            let gross = Decimal::from(limit) + Decimal::new(delta_cents, 2);
            let result = calculate_statutory_deductions(
                &SalaryComponents::default(),
                &ProratedEarnings { basic: gross, ..Default::default() },
                &config,
                1,
            );
            prop_assert_eq!(result.esic_applicable, delta_cents <= 0);
        }
    }
}
