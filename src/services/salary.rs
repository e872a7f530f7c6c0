//! Salary structure revisions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::{ChangeAction, ChangeLogEntry, IncrementType, SalaryComponents, SalaryRevision};
use crate::store::UnitOfWork;

use super::EngineContext;

/// A new salary version for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRevisionRequest {
    /// The employee.
    pub user_id: String,
    /// Amounts of the new version.
    pub components: SalaryComponents,
    /// First day the new version applies.
    pub effective_from: NaiveDate,
    /// Kind of change.
    pub increment_type: IncrementType,
}

/// Appends versions to the salary chain.
#[derive(Clone)]
pub struct SalaryService {
    ctx: EngineContext,
}

impl SalaryService {
    /// Creates the service.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Closes the open version and appends a new one, atomically with its
    /// change log and audit entry.
    pub fn revise_structure(
        &self,
        request: &SalaryRevisionRequest,
        changed_by: &str,
    ) -> EngineResult<SalaryRevision> {
        let user_id = request.user_id.as_str();
        if self.ctx.directory.employee(user_id)?.is_none() {
            return Err(EngineError::EmployeeNotFound {
                user_id: user_id.to_string(),
            });
        }

        let mut history = self.ctx.store.salary_history(user_id)?;
        let revision = history.revise(
            user_id,
            request.components.clone(),
            request.effective_from,
            request.increment_type,
            changed_by,
        )?;

        let mut unit = UnitOfWork::new();
        unit.salary_structures.extend(revision.closed.iter().cloned());
        unit.salary_structures.push(revision.created.clone());
        unit.salary_change_logs.push(revision.change_log.clone());
        unit.audit.push(ChangeLogEntry::capture(
            "SalaryStructure",
            &revision.created.id,
            ChangeAction::Create,
            revision.closed.as_ref(),
            &revision.created,
            changed_by,
        ));
        self.ctx.store.commit(unit)?;

        info!(
            user_id,
            structure_id = %revision.created.id,
            previous = ?revision.created.previous_structure_id,
            effective_from = %request.effective_from,
            gross_salary = %revision.created.totals().gross_salary,
            "Salary structure revised"
        );
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PayrollPeriod;
    use crate::services::PayrollOutcome;
    use crate::services::testing::{Fixture, date, dec, period};
    use crate::store::EngineStore;

    fn request(basic: &str, effective_from: NaiveDate) -> SalaryRevisionRequest {
        SalaryRevisionRequest {
            user_id: "emp_001".to_string(),
            components: SalaryComponents {
                basic: dec(basic),
                hra: dec("12000"),
                tds: dec("1000"),
                ..Default::default()
            },
            effective_from,
            increment_type: IncrementType::Annual,
        }
    }

    #[test]
    fn test_revision_closes_previous_version() {
        let fixture = Fixture::new();
        let revision = fixture
            .salary()
            .revise_structure(&request("33000", date(2025, 10, 1)), "hr")
            .unwrap();

        let closed = revision.closed.unwrap();
        assert_eq!(closed.effective_to, Some(date(2025, 9, 30)));
        assert_eq!(
            revision.created.previous_structure_id.as_deref(),
            Some(closed.id.as_str())
        );

        let history = fixture.store.salary_history("emp_001").unwrap();
        assert_eq!(history.versions().len(), 2);
        assert_eq!(history.current().unwrap().id, revision.created.id);
        assert_eq!(fixture.store.salary_change_logs("emp_001").unwrap().len(), 1);
    }

    #[test]
    fn test_payroll_uses_structure_in_force_at_month_end() {
        let fixture = Fixture::new();
        fixture
            .salary()
            .revise_structure(&request("33000", date(2025, 10, 1)), "hr")
            .unwrap();

        // September still resolves the old version.
        let record = match fixture
            .payroll()
            .generate_payroll("emp_001", period(), "hr")
            .unwrap()
        {
            PayrollOutcome::Generated { record } => record,
            other => panic!("Expected a generated record, got {:?}", other),
        };
        assert_eq!(record.earnings.basic, dec("27000"));
        let history = fixture.store.salary_history("emp_001").unwrap();
        let october = history
            .resolve(PayrollPeriod::new(10, 2025).unwrap().last_day())
            .unwrap();
        assert_ne!(record.salary_structure_id, october.id);
    }

    #[test]
    fn test_backdated_revision_rejected() {
        let fixture = Fixture::new();
        assert!(matches!(
            fixture
                .salary()
                .revise_structure(&request("33000", date(2025, 3, 1)), "hr"),
            Err(EngineError::InvalidInput { .. })
        ));
    }
}
