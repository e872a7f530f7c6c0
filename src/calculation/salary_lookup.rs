//! Salary structure resolution.
//!
//! Payroll for a month uses the structure effective on the last day of that
//! month, not the structure effective on the day payroll happens to run.

use chrono::NaiveDate;

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, SalaryHistory, SalaryStructure};

/// The result of a salary structure lookup, including the structure and audit step.
#[derive(Debug, Clone)]
pub struct SalaryLookupResult {
    /// The structure effective on the as-of date.
    pub structure: SalaryStructure,
    /// The audit step recording this lookup.
    pub audit_step: AuditStep,
}

/// Resolves the structure effective on `as_of` from a user's history.
///
/// # Errors
///
/// Returns [`EngineError::SalaryStructureNotFound`] when no version covers
/// `as_of`.
pub fn resolve_salary_structure(
    user_id: &str,
    history: &SalaryHistory,
    as_of: NaiveDate,
    step_number: u32,
) -> EngineResult<SalaryLookupResult> {
    let structure = history
        .resolve(as_of)
        .cloned()
        .ok_or_else(|| EngineError::SalaryStructureNotFound {
            user_id: user_id.to_string(),
            date: as_of,
        })?;

    let totals = structure.totals();
    let audit_step = AuditStep {
        step_number,
        rule_id: "salary_structure_lookup".to_string(),
        rule_name: "Salary Structure Lookup".to_string(),
        reference: "salary_structure.effective_window".to_string(),
        input: serde_json::json!({
            "user_id": user_id,
            "as_of": as_of.to_string(),
            "versions": history.versions().len()
        }),
        output: serde_json::json!({
            "salary_structure_id": structure.id,
            "effective_from": structure.effective_from.to_string(),
            "effective_to": structure.effective_to.map(|d| d.to_string()),
            "gross_salary": totals.gross_salary.to_string(),
            "basic": structure.components().basic.to_string()
        }),
        reasoning: format!(
            "Structure {} effective from {} covers {}",
            structure.id, structure.effective_from, as_of
        ),
    };

    Ok(SalaryLookupResult {
        structure,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IncrementType, SalaryComponents};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn history_with_mid_month_revision() -> SalaryHistory {
        let mut history = SalaryHistory::default();
        history
            .revise(
                "emp_001",
                SalaryComponents {
                    basic: dec("30000"),
                    ..Default::default()
                },
                date(2024, 4, 1),
                IncrementType::Initial,
                "hr",
            )
            .unwrap();
        history
            .revise(
                "emp_001",
                SalaryComponents {
                    basic: dec("36000"),
                    ..Default::default()
                },
                date(2025, 8, 16),
                IncrementType::Annual,
                "hr",
            )
            .unwrap();
        history
    }

    #[test]
    fn test_month_end_picks_revision_starting_mid_month() {
        let history = history_with_mid_month_revision();
        let result = resolve_salary_structure("emp_001", &history, date(2025, 8, 31), 1).unwrap();
        assert_eq!(result.structure.components().basic, dec("36000"));
        assert_eq!(result.audit_step.rule_id, "salary_structure_lookup");
    }

    #[test]
    fn test_earlier_month_uses_closed_version() {
        let history = history_with_mid_month_revision();
        let result = resolve_salary_structure("emp_001", &history, date(2025, 7, 31), 1).unwrap();
        assert_eq!(result.structure.components().basic, dec("30000"));
        assert_eq!(result.structure.effective_to, Some(date(2025, 8, 15)));
    }

    #[test]
    fn test_missing_structure_is_dependency_error() {
        let history = history_with_mid_month_revision();
        match resolve_salary_structure("emp_001", &history, date(2024, 3, 31), 1) {
            Err(EngineError::SalaryStructureNotFound { user_id, date: d }) => {
                assert_eq!(user_id, "emp_001");
                assert_eq!(d, date(2024, 3, 31));
            }
            other => panic!("Expected SalaryStructureNotFound, got {:?}", other),
        }
    }
}
