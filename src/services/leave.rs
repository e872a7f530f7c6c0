//! Leave crediting: joining pro-rata, periodic accrual and carry-forward.
//!
//! Every credit goes through the ledger's idempotency key, so any of these
//! runs may be repeated for the same period without double-crediting. One
//! category failing never stops the others for the same user.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::calculation::{
    calculate_carry_forward, calculate_joining_credit, calculate_periodic_credit,
};
use crate::config::{BatchSettings, LeaveCategoryConfig, LeaveRules};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CategoryCredit, CategoryError, ChangeAction, ChangeLogEntry, CreditKey, CreditSource,
    LeaveBalance, LeaveCreditResult, LeaveLedgerEntry, PayrollPeriod,
};
use crate::store::UnitOfWork;

use super::EngineContext;
use super::jobs::{JobReport, JobRunner};

/// Credits leave to balances.
#[derive(Clone)]
pub struct LeaveService {
    ctx: EngineContext,
}

impl LeaveService {
    /// Creates the service.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Credits the pro-rata joining allocation of every category.
    ///
    /// Missing calendar or category configuration aborts the run early and
    /// is reported as a `*` error on the result rather than raised.
    pub fn credit_joining_leaves(
        &self,
        user_id: &str,
        date_of_joining: NaiveDate,
        created_by: &str,
    ) -> LeaveCreditResult {
        let mut result = LeaveCreditResult::new(user_id);
        let rules = match LeaveRules::resolve(self.ctx.config.as_ref(), date_of_joining) {
            Ok(rules) => rules,
            Err(err) => {
                warn!(user_id, error = %err, "Leave configuration missing, joining credit aborted");
                result.errors.push(abort(&err));
                return result;
            }
        };
        let financial_year = rules.financial_year.label();
        result.financial_year = Some(financial_year.clone());

        for category in &rules.categories {
            if category.annual_quota <= Decimal::ZERO {
                result.categories_skipped.push(zero_quota(category));
                continue;
            }
            let credit = calculate_joining_credit(date_of_joining, &rules.calendar, category, 1);
            let key = CreditKey {
                user_id: user_id.to_string(),
                category: category.code.clone(),
                financial_year: financial_year.clone(),
                month: None,
                source: CreditSource::JoiningCredit,
            };
            self.credit(&mut result, key, credit.days, credit.notes, created_by);
        }

        info!(
            user_id,
            financial_year = %financial_year,
            credited = result.categories_credited.len(),
            errors = result.errors.len(),
            "Joining leave credited"
        );
        result
    }

    /// Credits the periodic accrual of `period` to every employee who joined
    /// before it.
    pub async fn run_monthly_accrual(
        &self,
        period: PayrollPeriod,
        created_by: &str,
    ) -> EngineResult<JobReport<LeaveCreditResult>> {
        let rules = Arc::new(LeaveRules::resolve(self.ctx.config.as_ref(), period.first_day())?);
        let joined: HashMap<String, NaiveDate> = self
            .ctx
            .directory
            .employees_in(period)?
            .into_iter()
            .filter(|e| e.date_of_joining < period.first_day())
            .map(|e| (e.id, e.date_of_joining))
            .collect();
        let mut user_ids: Vec<String> = joined.keys().cloned().collect();
        user_ids.sort();
        let runner = self.runner(period.first_day());

        let service = self.clone();
        let actor = created_by.to_string();
        Ok(runner
            .run("monthly_accrual", user_ids, move |user_id| {
                let date_of_joining = joined.get(user_id).copied().ok_or_else(|| {
                    EngineError::EmployeeNotFound {
                        user_id: user_id.to_string(),
                    }
                })?;
                Ok(service.accrue_user(user_id, date_of_joining, period, &rules, &actor))
            })
            .await)
    }

    fn accrue_user(
        &self,
        user_id: &str,
        date_of_joining: NaiveDate,
        period: PayrollPeriod,
        rules: &LeaveRules,
        created_by: &str,
    ) -> LeaveCreditResult {
        let mut result = LeaveCreditResult::new(user_id);
        let financial_year = rules.financial_year.label();
        result.financial_year = Some(financial_year.clone());

        for category in &rules.categories {
            if category.annual_quota <= Decimal::ZERO {
                result.categories_skipped.push(zero_quota(category));
                continue;
            }
            let Some(credit) = calculate_periodic_credit(
                category,
                &rules.calendar,
                rules.financial_year,
                period,
                date_of_joining,
                1,
            ) else {
                result.categories_skipped.push(CategoryError {
                    category: category.code.clone(),
                    message: format!(
                        "no {:?} credit due in {}",
                        category.credit_frequency, period
                    ),
                });
                continue;
            };
            let key = CreditKey {
                user_id: user_id.to_string(),
                category: category.code.clone(),
                financial_year: financial_year.clone(),
                month: Some(period.month),
                source: credit.source,
            };
            self.credit(&mut result, key, credit.days, credit.notes, created_by);
        }
        result
    }

    /// Moves unused balances of `financial_year` (a label such as
    /// `2025-2026`) into the following year.
    pub async fn carry_forward(
        &self,
        financial_year: &str,
        created_by: &str,
    ) -> EngineResult<JobReport<LeaveCreditResult>> {
        let start_year = parse_start_year(financial_year)?;
        // 31 December of the start year lies inside the financial year for any start month.
        let year_end = NaiveDate::from_ymd_opt(start_year, 12, 31)
            .ok_or_else(|| EngineError::invalid_input("financial_year", "year out of range"))?;
        let rules = LeaveRules::resolve(self.ctx.config.as_ref(), year_end)?;
        if rules.financial_year.label() != financial_year {
            return Err(EngineError::invalid_input(
                "financial_year",
                format!(
                    "'{}' does not match the configured calendar (expected {})",
                    financial_year,
                    rules.financial_year.label()
                ),
            ));
        }

        let closing_period = rules.financial_year.period_at(12);
        let user_ids = self
            .ctx
            .directory
            .employees_in(closing_period)?
            .into_iter()
            .map(|e| e.id)
            .collect();
        let runner = self.runner(year_end);

        let service = self.clone();
        let actor = created_by.to_string();
        let rules = Arc::new(rules);
        Ok(runner
            .run("carry_forward", user_ids, move |user_id| {
                service.carry_forward_user(user_id, &rules, &actor)
            })
            .await)
    }

    fn carry_forward_user(
        &self,
        user_id: &str,
        rules: &LeaveRules,
        created_by: &str,
    ) -> EngineResult<LeaveCreditResult> {
        let from = rules.financial_year.label();
        let to = rules.financial_year.next().label();
        let mut result = LeaveCreditResult::new(user_id);
        result.financial_year = Some(to.clone());

        let balances = self.ctx.store.leave_balances(user_id, &from)?;
        for category in &rules.categories {
            let Some(balance) = balances.iter().find(|b| b.category == category.code) else {
                continue;
            };
            let Some(carry) = calculate_carry_forward(balance, category, &to, 1) else {
                result.categories_skipped.push(CategoryError {
                    category: category.code.clone(),
                    message: "carry-forward disabled".to_string(),
                });
                continue;
            };
            if balance.is_overconsumed() {
                warn!(
                    user_id,
                    category = %category.code,
                    available = %balance.available(),
                    "Over-consumed balance carries nothing"
                );
            }
            let key = CreditKey {
                user_id: user_id.to_string(),
                category: category.code.clone(),
                financial_year: to.clone(),
                month: None,
                source: CreditSource::CarryForward,
            };
            self.credit(&mut result, key, carry.days, carry.notes, created_by);
        }
        Ok(result)
    }

    fn runner(&self, as_of: NaiveDate) -> JobRunner {
        JobRunner::from_settings(&BatchSettings::resolve(self.ctx.config.as_ref(), as_of))
    }

    /// Applies one ledger entry, recording the outcome on `result`.
    ///
    /// The entry and the audit snapshot of the balance it produces are
    /// committed together.
    fn credit(
        &self,
        result: &mut LeaveCreditResult,
        key: CreditKey,
        days: Decimal,
        notes: String,
        created_by: &str,
    ) {
        let category = key.category.clone();
        let audit_key = key.to_string();
        let applied = CategoryCredit {
            category: category.clone(),
            days,
            notes: notes.clone(),
            newly_applied: false,
        };
        let entry = LeaveLedgerEntry {
            key,
            days,
            notes,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };

        match self.commit_credit(entry, created_by) {
            Ok(newly_applied) => result.categories_credited.push(CategoryCredit {
                newly_applied,
                ..applied
            }),
            Err(err) => {
                warn!(key = %audit_key, error = %err, "Leave credit failed");
                result.errors.push(CategoryError {
                    category,
                    message: err.to_string(),
                });
            }
        }
    }

    /// Returns false when the key was already credited.
    fn commit_credit(&self, entry: LeaveLedgerEntry, created_by: &str) -> EngineResult<bool> {
        let store = &self.ctx.store;
        if store.ledger_entry(&entry.key)?.is_some() {
            return Ok(false);
        }
        let key = &entry.key;
        let mut balance = store
            .leave_balance(&key.user_id, &key.category, &key.financial_year)?
            .unwrap_or_else(|| LeaveBalance::new(&key.user_id, &key.category, &key.financial_year));
        balance.apply(&entry);

        let mut unit = UnitOfWork::new();
        unit.audit.push(ChangeLogEntry::capture(
            "LeaveBalance",
            &key.to_string(),
            ChangeAction::Create,
            None,
            &balance,
            created_by,
        ));
        let key = entry.key.clone();
        unit.leave_credits.push(entry);
        match store.commit(unit) {
            Ok(()) => Ok(true),
            // A concurrent run may have credited the key in between.
            Err(err) => match store.ledger_entry(&key)? {
                Some(_) => Ok(false),
                None => Err(err),
            },
        }
    }
}

fn abort(err: &EngineError) -> CategoryError {
    CategoryError {
        category: "*".to_string(),
        message: err.to_string(),
    }
}

fn zero_quota(category: &LeaveCategoryConfig) -> CategoryError {
    CategoryError {
        category: category.code.clone(),
        message: "annual quota is zero".to_string(),
    }
}

fn parse_start_year(label: &str) -> EngineResult<i32> {
    label
        .split('-')
        .next()
        .and_then(|year| year.parse::<i32>().ok())
        .ok_or_else(|| {
            EngineError::invalid_input(
                "financial_year",
                format!("'{}' is not a financial year label", label),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Employee;
    use crate::services::testing::{Fixture, date, dec};
    use crate::store::{AuditLog, EngineStore};

    fn add_joiner(fixture: &Fixture, user_id: &str, joined: NaiveDate) {
        fixture
            .store
            .add_employee(Employee {
                id: user_id.to_string(),
                name: "New Joiner".to_string(),
                date_of_joining: joined,
                exit_date: None,
                is_active: true,
            })
            .unwrap();
    }

    fn credited<'a>(result: &'a LeaveCreditResult, code: &str) -> &'a CategoryCredit {
        result
            .categories_credited
            .iter()
            .find(|c| c.category == code)
            .unwrap()
    }

    #[test]
    fn test_joining_on_cutoff_day_gets_full_month() {
        let fixture = Fixture::new();
        let result = fixture
            .leave()
            .credit_joining_leaves("emp_001", date(2025, 6, 15), "hr");

        assert!(result.is_success());
        assert_eq!(result.financial_year.as_deref(), Some("2025-2026"));
        // (9 remaining + 1) × 18 / 12
        assert_eq!(credited(&result, "EL").days, dec("15"));
        assert_eq!(credited(&result, "CL").days, dec("1"));
        assert_eq!(credited(&result, "SL").days, dec("6.7"));
        assert_eq!(result.categories_skipped[0].category, "CO");
    }

    #[test]
    fn test_joining_after_cutoff_gets_half_month() {
        let fixture = Fixture::new();
        let result = fixture
            .leave()
            .credit_joining_leaves("emp_001", date(2025, 6, 16), "hr");

        // (9 + 0.5) × 18 / 12 = 14.25
        assert_eq!(credited(&result, "EL").days, dec("14.3"));
        assert_eq!(credited(&result, "CL").days, dec("0.5"));
    }

    #[test]
    fn test_credit_and_audit_entry_land_together() {
        let fixture = Fixture::new();
        fixture
            .leave()
            .credit_joining_leaves("emp_001", date(2025, 6, 15), "hr");

        let key = CreditKey {
            user_id: "emp_001".to_string(),
            category: "EL".to_string(),
            financial_year: "2025-2026".to_string(),
            month: None,
            source: CreditSource::JoiningCredit,
        };
        let entries = fixture
            .store
            .entries_for("LeaveBalance", &key.to_string())
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ChangeAction::Create);
        let snapshot: LeaveBalance = serde_json::from_value(entries[0].new_values.clone()).unwrap();
        assert_eq!(snapshot.total_allocated, dec("15"));
    }

    #[test]
    fn test_joining_credit_is_idempotent() {
        let fixture = Fixture::new();
        let service = fixture.leave();
        service.credit_joining_leaves("emp_001", date(2025, 6, 15), "hr");
        let again = service.credit_joining_leaves("emp_001", date(2025, 6, 15), "hr");

        assert!(again.categories_credited.iter().all(|c| !c.newly_applied));
        let balance = fixture
            .store
            .leave_balance("emp_001", "EL", "2025-2026")
            .unwrap()
            .unwrap();
        assert_eq!(balance.total_allocated, dec("15"));
    }

    #[tokio::test]
    async fn test_monthly_accrual_runs_once_per_month() {
        let fixture = Fixture::new();
        let service = fixture.leave();
        let july = PayrollPeriod::new(7, 2025).unwrap();

        let report = service.run_monthly_accrual(july, "system").await.unwrap();
        let (_, result) = &report.succeeded[0];
        // CL monthly; SL quarterly, and July opens the second quarter.
        assert_eq!(credited(result, "CL").days, dec("1"));
        assert_eq!(credited(result, "SL").days, dec("2"));

        service.run_monthly_accrual(july, "system").await.unwrap();
        let balance = fixture
            .store
            .leave_balance("emp_001", "CL", "2025-2026")
            .unwrap()
            .unwrap();
        assert_eq!(balance.total_allocated, dec("1"));
    }

    #[tokio::test]
    async fn test_new_joiners_wait_for_next_month() {
        let fixture = Fixture::new();
        add_joiner(&fixture, "emp_new", date(2025, 7, 3));

        let report = fixture
            .leave()
            .run_monthly_accrual(PayrollPeriod::new(7, 2025).unwrap(), "system")
            .await
            .unwrap();
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.succeeded[0].0, "emp_001");
    }

    #[tokio::test]
    async fn test_joining_year_is_not_credited_twice() {
        let fixture = Fixture::new();
        add_joiner(&fixture, "emp_new", date(2025, 6, 15));
        let service = fixture.leave();
        service.credit_joining_leaves("emp_new", date(2025, 6, 15), "hr");

        for (month, year) in [(7, 2025), (10, 2025), (1, 2026)] {
            let period = PayrollPeriod::new(month, year).unwrap();
            let report = service.run_monthly_accrual(period, "system").await.unwrap();
            let (_, result) = report
                .succeeded
                .iter()
                .find(|(user_id, _)| user_id == "emp_new")
                .unwrap();
            assert!(result.categories_skipped.iter().any(|c| c.category == "SL"));
        }

        let balance = |code: &str| {
            fixture
                .store
                .leave_balance("emp_new", code, "2025-2026")
                .unwrap()
                .unwrap()
                .total_allocated
        };
        assert_eq!(balance("SL"), dec("6.7"));
        assert_eq!(balance("EL"), dec("15"));
        // Joining month plus July, October and January.
        assert_eq!(balance("CL"), dec("4"));
    }

    #[tokio::test]
    async fn test_pro_rata_quota_opens_each_later_year() {
        let fixture = Fixture::new();
        let april = PayrollPeriod::new(4, 2026).unwrap();
        let report = fixture
            .leave()
            .run_monthly_accrual(april, "system")
            .await
            .unwrap();
        let (_, result) = &report.succeeded[0];
        let earned = credited(result, "EL");
        assert_eq!(earned.days, dec("18"));
        assert!(earned.newly_applied);
        assert_eq!(credited(result, "CL").days, dec("1"));
        assert_eq!(credited(result, "SL").days, dec("2"));

        let balance = fixture
            .store
            .leave_balance("emp_001", "EL", "2026-2027")
            .unwrap()
            .unwrap();
        assert_eq!(balance.total_allocated, dec("18"));
    }

    #[tokio::test]
    async fn test_carry_forward_caps_and_floors() {
        let fixture = Fixture::new();
        let mut earned = LeaveBalance::new("emp_001", "EL", "2025-2026");
        earned.total_allocated = dec("40");
        earned.consumed = dec("4");
        fixture.store.set_leave_balance(earned).unwrap();
        let mut sick = LeaveBalance::new("emp_001", "SL", "2025-2026");
        sick.total_allocated = dec("2");
        sick.consumed = dec("3");
        fixture.store.set_leave_balance(sick).unwrap();

        let report = fixture
            .leave()
            .carry_forward("2025-2026", "system")
            .await
            .unwrap();
        let (_, result) = &report.succeeded[0];
        assert_eq!(result.financial_year.as_deref(), Some("2026-2027"));
        assert_eq!(credited(result, "EL").days, dec("30"));
        assert_eq!(credited(result, "SL").days, Decimal::ZERO);

        let next = fixture
            .store
            .leave_balance("emp_001", "EL", "2026-2027")
            .unwrap()
            .unwrap();
        assert_eq!(next.carried_forward, dec("30"));
    }

    #[tokio::test]
    async fn test_carry_forward_rejects_unknown_label() {
        let fixture = Fixture::new();
        assert!(matches!(
            fixture.leave().carry_forward("FY25", "system").await,
            Err(EngineError::InvalidInput { .. })
        ));
    }
}
