//! In-memory implementation of every collaborator seam.
//!
//! Used by the server binary, the integration tests and the benchmarks. All
//! state sits behind one `RwLock`, so a [`UnitOfWork`] is validated and
//! applied under a single write guard.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceSummary, Bonus, ChangeLogEntry, CreditKey, Employee, FnfSettlement, LeaveBalance,
    LeaveLedgerEntry, PayrollPeriod, PayrollRecord, PayrollStatus, SalaryChangeLog, SalaryHistory,
    SalaryStructure, SettlementItem,
};

use super::{AttendanceSource, AuditLog, EmployeeDirectory, EngineStore, ExpenseLedger, UnitOfWork};

type BalanceKey = (String, String, String);

#[derive(Debug, Default)]
struct State {
    employees: BTreeMap<String, Employee>,
    attendance: HashMap<(String, PayrollPeriod), AttendanceSummary>,
    reimbursements: HashMap<String, Vec<SettlementItem>>,
    advances: HashMap<String, Vec<SettlementItem>>,
    salary: HashMap<String, Vec<SalaryStructure>>,
    salary_change_logs: Vec<SalaryChangeLog>,
    payrolls: HashMap<String, PayrollRecord>,
    payroll_index: HashMap<(String, PayrollPeriod), String>,
    bonuses: BTreeMap<String, Bonus>,
    // (user, financial year, category)
    balances: BTreeMap<BalanceKey, LeaveBalance>,
    ledger: HashMap<CreditKey, LeaveLedgerEntry>,
    settlements: HashMap<String, FnfSettlement>,
    audit: Vec<ChangeLogEntry>,
}

impl State {
    fn balance_mut(&mut self, key: &CreditKey) -> &mut LeaveBalance {
        self.balances
            .entry((
                key.user_id.clone(),
                key.financial_year.clone(),
                key.category.clone(),
            ))
            .or_insert_with(|| LeaveBalance::new(&key.user_id, &key.category, &key.financial_year))
    }

    fn credit(&mut self, entry: LeaveLedgerEntry) {
        self.balance_mut(&entry.key).apply(&entry);
        self.ledger.insert(entry.key.clone(), entry);
    }

    fn reverse(&mut self, key: &CreditKey) {
        if let Some(entry) = self.ledger.remove(key) {
            self.balance_mut(key).revert(&entry);
        }
    }

    fn validate(&self, unit: &UnitOfWork) -> EngineResult<()> {
        for record in &unit.payrolls {
            let stored = self.payrolls.get(&record.id);
            if stored.is_some_and(|s| s.status == PayrollStatus::Paid) {
                return Err(EngineError::PayrollAlreadyPaid {
                    user_id: record.user_id.clone(),
                    month: record.month,
                    year: record.year,
                });
            }
            let index_key = (record.user_id.clone(), record.period());
            if let Some(existing) = self.payroll_index.get(&index_key) {
                if existing != &record.id {
                    return Err(EngineError::store(format!(
                        "payroll {} conflicts with {} for user '{}' in {}",
                        record.id,
                        existing,
                        record.user_id,
                        record.period()
                    )));
                }
            }
        }
        for entry in &unit.leave_credits {
            if self.ledger.contains_key(&entry.key) && !unit.leave_reversals.contains(&entry.key) {
                return Err(EngineError::store(format!(
                    "leave credit {} already applied",
                    entry.key
                )));
            }
        }
        for bonus in &unit.bonuses {
            if !self.bonuses.contains_key(&bonus.id) {
                return Err(EngineError::store(format!("unknown bonus {}", bonus.id)));
            }
        }
        Ok(())
    }

    fn apply(&mut self, unit: UnitOfWork) {
        for key in &unit.leave_reversals {
            self.reverse(key);
        }
        for entry in unit.leave_credits {
            self.credit(entry);
        }
        for record in unit.payrolls {
            self.payroll_index
                .insert((record.user_id.clone(), record.period()), record.id.clone());
            self.payrolls.insert(record.id.clone(), record);
        }
        for bonus in unit.bonuses {
            self.bonuses.insert(bonus.id.clone(), bonus);
        }
        for settlement in unit.settlements {
            self.settlements.insert(settlement.user_id.clone(), settlement);
        }
        for structure in unit.salary_structures {
            let versions = self.salary.entry(structure.user_id.clone()).or_default();
            match versions.iter_mut().find(|s| s.id == structure.id) {
                Some(existing) => *existing = structure,
                None => versions.push(structure),
            }
        }
        self.salary_change_logs.extend(unit.salary_change_logs);
        self.audit.extend(unit.audit);
    }
}

/// Thread-safe in-memory store.
///
/// # Example
///
/// ```
/// use compensation_engine::models::{Employee, PayrollPeriod};
/// use compensation_engine::store::{EmployeeDirectory, MemoryStore};
/// use chrono::NaiveDate;
///
/// let store = MemoryStore::new();
/// store.add_employee(Employee {
///     id: "emp_001".to_string(),
///     name: "Asha Rao".to_string(),
///     date_of_joining: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
///     exit_date: None,
///     is_active: true,
/// }).unwrap();
///
/// let period = PayrollPeriod::new(6, 2025).unwrap();
/// assert_eq!(store.employees_in(period).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| EngineError::store("memory store lock poisoned"))
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| EngineError::store("memory store lock poisoned"))
    }

    /// Adds or replaces an employee.
    pub fn add_employee(&self, employee: Employee) -> EngineResult<()> {
        self.write()?.employees.insert(employee.id.clone(), employee);
        Ok(())
    }

    /// Sets the attendance summary of a user for a month.
    pub fn set_attendance(
        &self,
        user_id: &str,
        period: PayrollPeriod,
        summary: AttendanceSummary,
    ) -> EngineResult<()> {
        self.write()?
            .attendance
            .insert((user_id.to_string(), period), summary);
        Ok(())
    }

    /// Adds or replaces a bonus.
    pub fn add_bonus(&self, bonus: Bonus) -> EngineResult<()> {
        self.write()?.bonuses.insert(bonus.id.clone(), bonus);
        Ok(())
    }

    /// A bonus by id.
    pub fn bonus(&self, bonus_id: &str) -> EngineResult<Option<Bonus>> {
        Ok(self.read()?.bonuses.get(bonus_id).cloned())
    }

    /// Adds a pending reimbursement.
    pub fn add_reimbursement(&self, user_id: &str, item: SettlementItem) -> EngineResult<()> {
        self.write()?
            .reimbursements
            .entry(user_id.to_string())
            .or_default()
            .push(item);
        Ok(())
    }

    /// Adds an outstanding advance.
    pub fn add_advance(&self, user_id: &str, item: SettlementItem) -> EngineResult<()> {
        self.write()?
            .advances
            .entry(user_id.to_string())
            .or_default()
            .push(item);
        Ok(())
    }

    /// Stores a salary version without going through a revision.
    pub fn insert_salary_structure(&self, structure: SalaryStructure) -> EngineResult<()> {
        self.commit(UnitOfWork {
            salary_structures: vec![structure],
            ..UnitOfWork::default()
        })
    }

    /// Adds or replaces a leave balance.
    pub fn set_leave_balance(&self, balance: LeaveBalance) -> EngineResult<()> {
        self.write()?.balances.insert(
            (
                balance.user_id.clone(),
                balance.financial_year.clone(),
                balance.category.clone(),
            ),
            balance,
        );
        Ok(())
    }

    /// Salary change logs of a user, oldest first.
    pub fn salary_change_logs(&self, user_id: &str) -> EngineResult<Vec<SalaryChangeLog>> {
        Ok(self
            .read()?
            .salary_change_logs
            .iter()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect())
    }
}

impl AttendanceSource for MemoryStore {
    fn monthly_summary(
        &self,
        user_id: &str,
        period: PayrollPeriod,
    ) -> EngineResult<AttendanceSummary> {
        self.read()?
            .attendance
            .get(&(user_id.to_string(), period))
            .cloned()
            .ok_or_else(|| EngineError::AttendanceUnavailable {
                user_id: user_id.to_string(),
                month: period.month,
                year: period.year,
                message: "no attendance summary recorded".to_string(),
            })
    }
}

impl EmployeeDirectory for MemoryStore {
    fn employee(&self, user_id: &str) -> EngineResult<Option<Employee>> {
        Ok(self.read()?.employees.get(user_id).cloned())
    }

    fn employees_in(&self, period: PayrollPeriod) -> EngineResult<Vec<Employee>> {
        Ok(self
            .read()?
            .employees
            .values()
            .filter(|e| e.is_employed_between(period.first_day(), period.last_day()))
            .cloned()
            .collect())
    }
}

impl ExpenseLedger for MemoryStore {
    fn pending_reimbursements(&self, user_id: &str) -> EngineResult<Vec<SettlementItem>> {
        Ok(self
            .read()?
            .reimbursements
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn outstanding_advances(&self, user_id: &str) -> EngineResult<Vec<SettlementItem>> {
        Ok(self.read()?.advances.get(user_id).cloned().unwrap_or_default())
    }
}

impl AuditLog for MemoryStore {
    fn record(&self, entry: ChangeLogEntry) -> EngineResult<()> {
        self.write()?.audit.push(entry);
        Ok(())
    }

    fn entries_for(&self, entity_name: &str, entity_id: &str) -> EngineResult<Vec<ChangeLogEntry>> {
        Ok(self
            .read()?
            .audit
            .iter()
            .filter(|e| e.entity_name == entity_name && e.entity_id == entity_id)
            .cloned()
            .collect())
    }
}

impl EngineStore for MemoryStore {
    fn salary_history(&self, user_id: &str) -> EngineResult<SalaryHistory> {
        let versions = self
            .read()?
            .salary
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        Ok(SalaryHistory::from_versions(versions))
    }

    fn find_payroll(
        &self,
        user_id: &str,
        period: PayrollPeriod,
    ) -> EngineResult<Option<PayrollRecord>> {
        let state = self.read()?;
        Ok(state
            .payroll_index
            .get(&(user_id.to_string(), period))
            .and_then(|id| state.payrolls.get(id))
            .cloned())
    }

    fn payroll_by_id(&self, payroll_id: &str) -> EngineResult<Option<PayrollRecord>> {
        Ok(self.read()?.payrolls.get(payroll_id).cloned())
    }

    fn bonuses_for(&self, user_id: &str, period: PayrollPeriod) -> EngineResult<Vec<Bonus>> {
        Ok(self
            .read()?
            .bonuses
            .values()
            .filter(|b| b.user_id == user_id && b.applies_to(period))
            .cloned()
            .collect())
    }

    fn leave_balance(
        &self,
        user_id: &str,
        category: &str,
        financial_year: &str,
    ) -> EngineResult<Option<LeaveBalance>> {
        Ok(self
            .read()?
            .balances
            .get(&(
                user_id.to_string(),
                financial_year.to_string(),
                category.to_string(),
            ))
            .cloned())
    }

    fn leave_balances(
        &self,
        user_id: &str,
        financial_year: &str,
    ) -> EngineResult<Vec<LeaveBalance>> {
        Ok(self
            .read()?
            .balances
            .values()
            .filter(|b| b.user_id == user_id && b.financial_year == financial_year)
            .cloned()
            .collect())
    }

    fn ledger_entry(&self, key: &CreditKey) -> EngineResult<Option<LeaveLedgerEntry>> {
        Ok(self.read()?.ledger.get(key).cloned())
    }

    fn settlement(&self, user_id: &str) -> EngineResult<Option<FnfSettlement>> {
        Ok(self.read()?.settlements.get(user_id).cloned())
    }

    fn commit(&self, unit: UnitOfWork) -> EngineResult<()> {
        let mut state = self.write()?;
        state.validate(&unit)?;
        debug!(
            payrolls = unit.payrolls.len(),
            leave_credits = unit.leave_credits.len(),
            leave_reversals = unit.leave_reversals.len(),
            audit = unit.audit.len(),
            "Unit committed"
        );
        state.apply(unit);
        Ok(())
    }
}
