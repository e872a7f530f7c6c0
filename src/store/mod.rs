//! Storage and collaborator seams.
//!
//! The engine reads raw facts (attendance, employees, expenses) from
//! collaborators it does not own and writes derived records through
//! [`EngineStore`]. Every write for one user's operation goes through a
//! single [`UnitOfWork`] so it lands atomically or not at all.
//!
//! All operations are synchronous; batch jobs run them on the blocking pool.

mod memory;
mod seed;

pub use memory::MemoryStore;
pub use seed::{SeedAttendance, SeedData, SeedItem, SeedStructure};

use crate::error::EngineResult;
use crate::models::{
    AttendanceSummary, Bonus, ChangeLogEntry, CreditKey, Employee, FnfSettlement,
    LeaveBalance, LeaveLedgerEntry, PayrollPeriod, PayrollRecord, SalaryChangeLog, SalaryHistory,
    SalaryStructure, SettlementItem,
};

/// Supplies monthly attendance aggregates.
pub trait AttendanceSource: Send + Sync {
    /// Attendance of `user_id` for `period`.
    ///
    /// Fails with `AttendanceUnavailable` when the aggregator has no data.
    fn monthly_summary(&self, user_id: &str, period: PayrollPeriod)
    -> EngineResult<AttendanceSummary>;
}

/// Read access to the HR directory.
pub trait EmployeeDirectory: Send + Sync {
    /// Looks up one employee.
    fn employee(&self, user_id: &str) -> EngineResult<Option<Employee>>;

    /// Employees employed at some point of `period`, ordered by id.
    fn employees_in(&self, period: PayrollPeriod) -> EngineResult<Vec<Employee>>;
}

/// Unsettled expense items.
pub trait ExpenseLedger: Send + Sync {
    /// Approved reimbursements not yet paid to the user.
    fn pending_reimbursements(&self, user_id: &str) -> EngineResult<Vec<SettlementItem>>;

    /// Advances the user has not repaid.
    fn outstanding_advances(&self, user_id: &str) -> EngineResult<Vec<SettlementItem>>;
}

/// Append-only audit log of entity mutations.
pub trait AuditLog: Send + Sync {
    /// Appends an entry.
    fn record(&self, entry: ChangeLogEntry) -> EngineResult<()>;

    /// Entries for one entity, oldest first.
    fn entries_for(&self, entity_name: &str, entity_id: &str) -> EngineResult<Vec<ChangeLogEntry>>;
}

/// A set of writes applied atomically by [`EngineStore::commit`].
///
/// Apply order: leave reversals, then leave credits, then every upsert, then
/// audit entries. A leave credit whose key already exists fails the whole
/// unit unless the same unit reverses that key, so a credit is replaced by
/// reversing its key and crediting it again. A payroll write over a PAID
/// record fails with `PayrollAlreadyPaid`.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    /// Payroll records to insert or replace, by id.
    pub payrolls: Vec<PayrollRecord>,
    /// Bonuses to replace, by id.
    pub bonuses: Vec<Bonus>,
    /// Ledger entries to remove, reverting their balance effect.
    pub leave_reversals: Vec<CreditKey>,
    /// Ledger entries to add.
    pub leave_credits: Vec<LeaveLedgerEntry>,
    /// Settlements to insert or replace, by user.
    pub settlements: Vec<FnfSettlement>,
    /// Salary versions to insert or replace, by id.
    pub salary_structures: Vec<SalaryStructure>,
    /// Salary change logs to append.
    pub salary_change_logs: Vec<SalaryChangeLog>,
    /// Audit entries to append.
    pub audit: Vec<ChangeLogEntry>,
}

impl UnitOfWork {
    /// Creates an empty unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the unit holds no writes.
    pub fn is_empty(&self) -> bool {
        self.payrolls.is_empty()
            && self.bonuses.is_empty()
            && self.leave_reversals.is_empty()
            && self.leave_credits.is_empty()
            && self.settlements.is_empty()
            && self.salary_structures.is_empty()
            && self.salary_change_logs.is_empty()
            && self.audit.is_empty()
    }
}

/// Persistence of everything the engine derives.
pub trait EngineStore: AuditLog {
    /// All salary versions of a user.
    fn salary_history(&self, user_id: &str) -> EngineResult<SalaryHistory>;

    /// The payroll record of `user_id` for `period`.
    fn find_payroll(&self, user_id: &str, period: PayrollPeriod)
    -> EngineResult<Option<PayrollRecord>>;

    /// A payroll record by id.
    fn payroll_by_id(&self, payroll_id: &str) -> EngineResult<Option<PayrollRecord>>;

    /// Bonuses of `user_id` applicable to `period`, in any status.
    fn bonuses_for(&self, user_id: &str, period: PayrollPeriod) -> EngineResult<Vec<Bonus>>;

    /// One leave balance.
    fn leave_balance(
        &self,
        user_id: &str,
        category: &str,
        financial_year: &str,
    ) -> EngineResult<Option<LeaveBalance>>;

    /// Every balance of a user for one financial year, ordered by category.
    fn leave_balances(&self, user_id: &str, financial_year: &str)
    -> EngineResult<Vec<LeaveBalance>>;

    /// A ledger entry by key.
    fn ledger_entry(&self, key: &CreditKey) -> EngineResult<Option<LeaveLedgerEntry>>;

    /// The settlement of an exiting user.
    fn settlement(&self, user_id: &str) -> EngineResult<Option<FnfSettlement>>;

    /// Applies every write in `unit` atomically.
    fn commit(&self, unit: UnitOfWork) -> EngineResult<()>;
}
