//! Orchestration of the calculators against the store.
//!
//! Services resolve configuration once per operation, read raw facts from
//! the collaborators in [`EngineContext`], run the pure calculators and
//! write every resulting change for one user through a single
//! [`UnitOfWork`](crate::store::UnitOfWork).

mod fnf;
mod jobs;
mod leave;
mod payroll;
mod salary;

pub use fnf::{FnfRequest, FnfService};
pub use jobs::{JobFailure, JobReport, JobRunner};
pub use leave::LeaveService;
pub use payroll::{BulkPayrollReport, PayrollOutcome, PayrollService, PayrollSummary, SkippedPayroll};
pub use salary::{SalaryRevisionRequest, SalaryService};

use std::sync::Arc;

use crate::config::ConfigResolver;
use crate::models::{AuditStep, AuditTrace};
use crate::store::{AttendanceSource, EmployeeDirectory, EngineStore, ExpenseLedger, MemoryStore};

/// The collaborators every service works against.
#[derive(Clone)]
pub struct EngineContext {
    /// Business parameters.
    pub config: Arc<dyn ConfigResolver>,
    /// Derived records.
    pub store: Arc<dyn EngineStore>,
    /// Monthly attendance aggregates.
    pub attendance: Arc<dyn AttendanceSource>,
    /// HR directory.
    pub directory: Arc<dyn EmployeeDirectory>,
    /// Reimbursements and advances.
    pub expenses: Arc<dyn ExpenseLedger>,
}

impl EngineContext {
    /// A context whose every collaborator is the same in-memory store.
    pub fn in_memory(config: Arc<dyn ConfigResolver>, store: Arc<MemoryStore>) -> Self {
        Self {
            config,
            store: store.clone(),
            attendance: store.clone(),
            directory: store.clone(),
            expenses: store,
        }
    }
}

/// Puts `first` ahead of `trace`, renumbering the steps that follow it.
fn prepend_step(first: AuditStep, trace: AuditTrace) -> AuditTrace {
    let mut merged = AuditTrace::default();
    merged.push(AuditStep {
        step_number: 1,
        ..first
    });
    for step in trace.steps {
        merged.push(AuditStep {
            step_number: merged.next_step(),
            ..step
        });
    }
    trace.warnings.into_iter().for_each(|w| merged.warn(w));
    merged
}

#[cfg(test)]
pub(crate) mod testing {
    use std::str::FromStr;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{EngineContext, FnfService, LeaveService, PayrollService, SalaryService};
    use crate::config::ConfigLoader;
    use crate::models::{
        AttendanceSummary, Bonus, BonusStatus, Employee, IncrementType, PayrollPeriod,
        SalaryComponents, SalaryStructure,
    };
    use crate::store::MemoryStore;

    pub fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn period() -> PayrollPeriod {
        PayrollPeriod::new(9, 2025).unwrap()
    }

    /// Default configuration plus `emp_001` (basic 30000, hra 12000, tds 1000)
    /// with September 2025 attendance of 25 present and 2 paid leave days.
    pub struct Fixture {
        pub store: Arc<MemoryStore>,
        pub ctx: EngineContext,
    }

    impl Fixture {
        pub fn new() -> Self {
            let config = ConfigLoader::load("./config/default").unwrap().into_store();
            let store = Arc::new(MemoryStore::new());
            let ctx = EngineContext::in_memory(Arc::new(config), store.clone());
            let fixture = Self { store, ctx };
            fixture.add_employee("emp_001");
            fixture.add_structure("emp_001", "30000");
            fixture
                .store
                .set_attendance(
                    "emp_001",
                    period(),
                    AttendanceSummary {
                        total_days: 30,
                        working_days: 30,
                        present_days: 25,
                        paid_leave_days: dec("2"),
                        ..Default::default()
                    },
                )
                .unwrap();
            fixture
        }

        pub fn add_employee(&self, user_id: &str) {
            self.store
                .add_employee(Employee {
                    id: user_id.to_string(),
                    name: format!("Employee {}", user_id),
                    date_of_joining: date(2019, 1, 10),
                    exit_date: None,
                    is_active: true,
                })
                .unwrap();
        }

        pub fn add_structure(&self, user_id: &str, basic: &str) {
            let structure = SalaryStructure::new(
                user_id,
                SalaryComponents {
                    basic: dec(basic),
                    hra: dec("12000"),
                    tds: dec("1000"),
                    ..Default::default()
                },
                date(2025, 4, 1),
                IncrementType::Initial,
            )
            .unwrap();
            self.store.insert_salary_structure(structure).unwrap();
        }

        pub fn add_bonus(&self, bonus_id: &str, amount: &str) {
            self.store
                .add_bonus(Bonus {
                    id: bonus_id.to_string(),
                    user_id: "emp_001".to_string(),
                    applicable_month: 9,
                    applicable_year: 2025,
                    amount: dec(amount),
                    reason: "Quarterly performance".to_string(),
                    status: BonusStatus::Pending,
                    consumed_by: None,
                })
                .unwrap();
        }

        pub fn payroll(&self) -> PayrollService {
            PayrollService::new(self.ctx.clone())
        }

        pub fn leave(&self) -> LeaveService {
            LeaveService::new(self.ctx.clone())
        }

        pub fn fnf(&self) -> FnfService {
            FnfService::new(self.ctx.clone())
        }

        pub fn salary(&self) -> SalaryService {
            SalaryService::new(self.ctx.clone())
        }
    }
}
