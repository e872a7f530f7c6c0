//! YAML seed data for the in-memory store.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceSummary, Bonus, Employee, IncrementType, LeaveBalance, PayrollPeriod,
    SalaryComponents, SalaryHistory, SalaryStructure, SettlementItem,
};

use super::{EngineStore, MemoryStore, UnitOfWork};

fn default_increment() -> IncrementType {
    IncrementType::Initial
}

/// One salary version of a seeded employee.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedStructure {
    /// Owner.
    pub user_id: String,
    /// First day the version applies.
    pub effective_from: NaiveDate,
    /// Kind of change; `initial` when omitted.
    #[serde(default = "default_increment")]
    pub increment_type: IncrementType,
    /// Amounts.
    #[serde(flatten)]
    pub components: SalaryComponents,
}

/// A monthly attendance summary.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAttendance {
    /// The employee.
    pub user_id: String,
    /// Month, 1 to 12.
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Day counts.
    #[serde(flatten)]
    pub summary: AttendanceSummary,
}

/// A reimbursement or advance.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedItem {
    /// The employee.
    pub user_id: String,
    /// The item.
    #[serde(flatten)]
    pub item: SettlementItem,
}

/// Contents of a seed file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    /// Employee records.
    pub employees: Vec<Employee>,
    /// Salary versions, in any order.
    pub salary_structures: Vec<SeedStructure>,
    /// Attendance summaries.
    pub attendance: Vec<SeedAttendance>,
    /// Bonuses.
    pub bonuses: Vec<Bonus>,
    /// Opening leave balances.
    pub leave_balances: Vec<LeaveBalance>,
    /// Pending reimbursements.
    pub reimbursements: Vec<SeedItem>,
    /// Outstanding advances.
    pub advances: Vec<SeedItem>,
}

impl SeedData {
    /// Reads a seed file.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| EngineError::ConfigParseError {
            path: path_str.clone(),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }
}

impl MemoryStore {
    /// Loads seed data. Salary versions of one user are chained oldest
    /// first, so each later version closes its predecessor.
    pub fn apply_seed(&self, seed: SeedData) -> EngineResult<()> {
        let employees = seed.employees.len();
        for employee in seed.employees {
            self.add_employee(employee)?;
        }

        let mut by_user: BTreeMap<String, Vec<SeedStructure>> = BTreeMap::new();
        for structure in seed.salary_structures {
            by_user
                .entry(structure.user_id.clone())
                .or_default()
                .push(structure);
        }
        for (user_id, mut versions) in by_user {
            versions.sort_by_key(|v| v.effective_from);
            let mut history = self.salary_history(&user_id)?;
            for version in versions {
                if history.versions().is_empty() {
                    let structure = SalaryStructure::new(
                        &user_id,
                        version.components,
                        version.effective_from,
                        version.increment_type,
                    )?;
                    self.insert_salary_structure(structure.clone())?;
                    history = SalaryHistory::from_versions(vec![structure]);
                    continue;
                }
                let revision = history.revise(
                    &user_id,
                    version.components,
                    version.effective_from,
                    version.increment_type,
                    "seed",
                )?;
                let mut unit = UnitOfWork::new();
                unit.salary_structures.extend(revision.closed.iter().cloned());
                unit.salary_structures.push(revision.created);
                unit.salary_change_logs.push(revision.change_log);
                self.commit(unit)?;
                history = self.salary_history(&user_id)?;
            }
        }

        for entry in seed.attendance {
            let period = PayrollPeriod::new(entry.month, entry.year)?;
            self.set_attendance(&entry.user_id, period, entry.summary)?;
        }
        for bonus in seed.bonuses {
            self.add_bonus(bonus)?;
        }
        for balance in seed.leave_balances {
            self.set_leave_balance(balance)?;
        }
        for entry in seed.reimbursements {
            self.add_reimbursement(&entry.user_id, entry.item)?;
        }
        for entry in seed.advances {
            self.add_advance(&entry.user_id, entry.item)?;
        }

        info!(employees, "Seed data loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EmployeeDirectory;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const SEED: &str = r#"
employees:
  - id: emp_001
    name: Asha
    date_of_joining: 2019-01-10
salary_structures:
  - user_id: emp_001
    effective_from: 2025-10-01
    increment_type: annual
    basic: "33000"
  - user_id: emp_001
    effective_from: 2025-04-01
    basic: "30000"
attendance:
  - user_id: emp_001
    month: 9
    year: 2025
    total_days: 30
    present_days: 28
"#;

    #[test]
    fn test_seed_chains_salary_versions() {
        let seed: SeedData = serde_yaml::from_str(SEED).unwrap();
        let store = MemoryStore::new();
        store.apply_seed(seed).unwrap();

        assert!(store.employee("emp_001").unwrap().is_some());
        let history = store.salary_history("emp_001").unwrap();
        assert_eq!(history.versions().len(), 2);
        let september = history
            .resolve(NaiveDate::from_ymd_opt(2025, 9, 30).unwrap())
            .unwrap();
        assert_eq!(september.components().basic, Decimal::from_str("30000").unwrap());
        assert_eq!(store.salary_change_logs("emp_001").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_is_reported() {
        assert!(matches!(
            SeedData::load("./does/not/exist.yaml"),
            Err(EngineError::ConfigParseError { .. })
        ));
    }
}
