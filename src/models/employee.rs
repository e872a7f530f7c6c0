//! Employee model and related types.
//!
//! Employees are owned by the HR directory; the engine only reads the fields
//! that affect compensation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why an employee is leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Voluntary resignation; notice-period rules apply.
    Resignation,
    /// Termination by the employer.
    Termination,
    /// Retirement on reaching superannuation age.
    Retirement,
    /// Death in service.
    Death,
    /// End of a fixed-term contract.
    ContractEnd,
}

impl ExitReason {
    /// Returns true if the exit was initiated by the employee.
    pub fn is_voluntary(&self) -> bool {
        matches!(self, ExitReason::Resignation)
    }
}

/// Represents an employee as seen by the compensation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The date the employee joined.
    pub date_of_joining: NaiveDate,
    /// Last working day, once an exit is recorded.
    #[serde(default)]
    pub exit_date: Option<NaiveDate>,
    /// Whether the employee is on the active payroll.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Employee {
    /// Returns true if the employee is on the payroll for any part of `[from, to]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use compensation_engine::models::Employee;
    /// use chrono::NaiveDate;
    ///
    /// let employee = Employee {
    ///     id: "emp_001".to_string(),
    ///     name: "Asha Rao".to_string(),
    ///     date_of_joining: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
    ///     exit_date: None,
    ///     is_active: true,
    /// };
    /// let may_1 = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
    /// let may_31 = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
    /// assert!(!employee.is_employed_between(may_1, may_31));
    /// ```
    pub fn is_employed_between(&self, from: NaiveDate, to: NaiveDate) -> bool {
        if self.date_of_joining > to {
            return false;
        }
        match self.exit_date {
            Some(exit) => exit >= from,
            None => self.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_employee(exit_date: Option<NaiveDate>) -> Employee {
        Employee {
            id: "emp_001".to_string(),
            name: "Asha Rao".to_string(),
            date_of_joining: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
            exit_date,
            is_active: true,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_deserialize_employee_defaults_active() {
        let json = r#"{
            "id": "emp_001",
            "name": "Asha Rao",
            "date_of_joining": "2020-01-15"
        }"#;

        let employee: Employee = serde_json::from_str(json).unwrap();
        assert!(employee.is_active);
        assert!(employee.exit_date.is_none());
    }

    #[test]
    fn test_exited_employee_still_employed_in_exit_month() {
        let employee = create_test_employee(Some(date(2025, 6, 12)));
        assert!(employee.is_employed_between(date(2025, 6, 1), date(2025, 6, 30)));
        assert!(!employee.is_employed_between(date(2025, 7, 1), date(2025, 7, 31)));
    }

    #[test]
    fn test_exit_reason_serialization() {
        let json = serde_json::to_string(&ExitReason::ContractEnd).unwrap();
        assert_eq!(json, "\"contract_end\"");
        assert!(ExitReason::Resignation.is_voluntary());
        assert!(!ExitReason::Termination.is_voluntary());
    }
}
