//! Payroll generation and its approval workflow.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{
    PayrollCalculation, PayrollInput, calculate_payroll, resolve_salary_structure,
};
use crate::config::{BatchSettings, HolidayCompensationMode, LeaveRules, PayrollRules};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Bonus, BonusStatus, ChangeAction, ChangeLogEntry, CreditKey, CreditSource, FnfStatus,
    LeaveLedgerEntry, PayrollPeriod, PayrollRecord, PayrollStatus,
};
use crate::store::UnitOfWork;

use super::jobs::{JobFailure, JobRunner};
use super::{EngineContext, prepend_step};

const ENTITY: &str = "Payroll";

/// Result of generating one user's payroll.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PayrollOutcome {
    /// The record was created or regenerated.
    Generated {
        /// The stored record.
        record: Box<PayrollRecord>,
    },
    /// The user has nothing to pay this month.
    Skipped {
        /// The user.
        user_id: String,
        /// Why.
        reason: String,
    },
}

/// Headline figures of a generated record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollSummary {
    /// Record id.
    pub payroll_id: String,
    /// Employee.
    pub user_id: String,
    /// Gross earnings.
    pub gross_earnings: Decimal,
    /// Net pay.
    pub net_payable: Decimal,
    /// Number of computation warnings on the record.
    pub warnings: usize,
}

/// A user the batch skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPayroll {
    /// Employee.
    pub user_id: String,
    /// Why.
    pub reason: String,
}

/// Outcome of a month-end run.
#[derive(Debug, Clone, Serialize)]
pub struct BulkPayrollReport {
    /// The month.
    pub period: PayrollPeriod,
    /// Generated records.
    pub succeeded: Vec<PayrollSummary>,
    /// Users without anything to pay.
    pub skipped: Vec<SkippedPayroll>,
    /// Users whose generation failed.
    pub failed: Vec<JobFailure>,
}

/// Generates payroll records and moves them through their workflow.
#[derive(Clone)]
pub struct PayrollService {
    ctx: EngineContext,
}

impl PayrollService {
    /// Creates the service.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Generates or regenerates the payroll of one user for `period`.
    ///
    /// # Errors
    ///
    /// Configuration failures, [`EngineError::PayrollAlreadyPaid`] for a paid
    /// record, and missing employee or attendance data. A user without a
    /// salary structure, or not employed in the month, is skipped.
    pub fn generate_payroll(
        &self,
        user_id: &str,
        period: PayrollPeriod,
        generated_by: &str,
    ) -> EngineResult<PayrollOutcome> {
        let rules = PayrollRules::resolve(self.ctx.config.as_ref(), period.last_day())?;
        self.generate_with_rules(user_id, period, &rules, generated_by)
    }

    /// Generates payroll for every employee of `period` on the worker pool.
    ///
    /// Configuration is resolved once up front; if it is missing the whole
    /// run fails before any user is touched.
    pub async fn generate_bulk_payroll(
        &self,
        period: PayrollPeriod,
        generated_by: &str,
    ) -> EngineResult<BulkPayrollReport> {
        let as_of = period.last_day();
        let rules = Arc::new(PayrollRules::resolve(self.ctx.config.as_ref(), as_of)?);
        if rules.holiday.mode == HolidayCompensationMode::Leave {
            LeaveRules::resolve(self.ctx.config.as_ref(), as_of)?;
        }
        let runner = JobRunner::from_settings(&BatchSettings::resolve(self.ctx.config.as_ref(), as_of));
        let user_ids = self
            .ctx
            .directory
            .employees_in(period)?
            .into_iter()
            .map(|e| e.id)
            .collect();

        let service = self.clone();
        let actor = generated_by.to_string();
        let report = runner
            .run("generate_payroll", user_ids, move |user_id| {
                service.generate_with_rules(user_id, period, &rules, &actor)
            })
            .await;

        let mut succeeded = Vec::new();
        let mut skipped = Vec::new();
        for (_, outcome) in report.succeeded {
            match outcome {
                PayrollOutcome::Generated { record } => succeeded.push(PayrollSummary {
                    payroll_id: record.id.clone(),
                    user_id: record.user_id.clone(),
                    gross_earnings: record.gross_earnings,
                    net_payable: record.net_payable,
                    warnings: record.audit_trace.warnings.len(),
                }),
                PayrollOutcome::Skipped { user_id, reason } => {
                    skipped.push(SkippedPayroll { user_id, reason })
                }
            }
        }
        info!(
            period = %period,
            generated = succeeded.len(),
            skipped = skipped.len(),
            failed = report.failed.len(),
            "Bulk payroll finished"
        );

        Ok(BulkPayrollReport {
            period,
            succeeded,
            skipped,
            failed: report.failed,
        })
    }

    fn generate_with_rules(
        &self,
        user_id: &str,
        period: PayrollPeriod,
        rules: &PayrollRules,
        generated_by: &str,
    ) -> EngineResult<PayrollOutcome> {
        let started = Instant::now();
        let employee = self
            .ctx
            .directory
            .employee(user_id)?
            .ok_or_else(|| EngineError::EmployeeNotFound {
                user_id: user_id.to_string(),
            })?;
        if !employee.is_employed_between(period.first_day(), period.last_day()) {
            return Ok(skipped(user_id, format!("not employed during {}", period)));
        }

        let existing = self.ctx.store.find_payroll(user_id, period)?;
        if let Some(record) = &existing {
            if record.status == PayrollStatus::Paid {
                return Err(EngineError::PayrollAlreadyPaid {
                    user_id: user_id.to_string(),
                    month: period.month,
                    year: period.year,
                });
            }
        }

        let as_of = period.last_day();
        let history = self.ctx.store.salary_history(user_id)?;
        let lookup = match resolve_salary_structure(user_id, &history, as_of, 1) {
            Ok(lookup) => lookup,
            Err(err @ EngineError::SalaryStructureNotFound { .. }) => {
                warn!(user_id, period = %period, "No salary structure, skipping");
                return Ok(skipped(user_id, err.to_string()));
            }
            Err(err) => return Err(err),
        };
        let attendance = self.ctx.attendance.monthly_summary(user_id, period)?;

        let payroll_id = existing
            .as_ref()
            .map(|r| r.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let was_approved = existing
            .as_ref()
            .is_some_and(|r| r.status == PayrollStatus::Approved);

        let stored_bonuses = self.ctx.store.bonuses_for(user_id, period)?;
        let mut bonuses = stored_bonuses.clone();
        if was_approved {
            // Bonuses go back to PENDING before the record is recomputed.
            for bonus in bonuses.iter_mut() {
                if bonus.consumed_by.as_deref() == Some(payroll_id.as_str())
                    && bonus.status == BonusStatus::Paid
                {
                    bonus.status = BonusStatus::Pending;
                }
            }
        }

        let calculation = calculate_payroll(PayrollInput {
            user_id,
            period,
            structure: &lookup.structure,
            attendance: &attendance,
            bonuses: &bonuses,
            payroll_id: Some(&payroll_id),
            rules,
        });

        for bonus in bonuses.iter_mut() {
            let itemized = calculation
                .bonus_details
                .iter()
                .any(|d| d.bonus_id == bonus.id);
            if itemized {
                bonus.consumed_by = Some(payroll_id.clone());
            } else if bonus.consumed_by.as_deref() == Some(payroll_id.as_str()) {
                bonus.consumed_by = None;
            }
        }

        let mut unit = UnitOfWork::new();
        self.stage_holiday_credit(&mut unit, user_id, period, rules, &calculation, generated_by)?;

        let now = Utc::now();
        let record = PayrollRecord {
            id: payroll_id.clone(),
            user_id: user_id.to_string(),
            month: period.month,
            year: period.year,
            status: PayrollStatus::Generated,
            salary_structure_id: lookup.structure.id.clone(),
            structure_as_of: as_of,
            attendance: calculation.attendance,
            earnings: calculation.earnings,
            deductions: calculation.deductions,
            total_bonus: calculation.total_bonus,
            bonus_details: calculation.bonus_details,
            holiday_bonus: calculation.holiday_bonus,
            holiday_leaves_credited: calculation.holiday_leaves_credited,
            gross_earnings: calculation.gross_earnings,
            total_deductions: calculation.total_deductions,
            net_payable: calculation.net_payable,
            audit_trace: prepend_step(lookup.audit_step, calculation.audit_trace),
            created_at: existing.as_ref().map(|r| r.created_at).unwrap_or(now),
            updated_at: now,
            approved_by: None,
            approved_at: None,
            paid_at: None,
        };

        let action = if existing.is_some() {
            ChangeAction::Regenerate
        } else {
            ChangeAction::Generate
        };
        stage_bonus_changes(&mut unit, &stored_bonuses, bonuses, generated_by);
        unit.audit.push(ChangeLogEntry::capture(
            ENTITY,
            &record.id,
            action,
            existing.as_ref(),
            &record,
            generated_by,
        ));
        unit.payrolls.push(record.clone());
        self.ctx.store.commit(unit)?;

        info!(
            user_id,
            period = %period,
            payroll_id = %record.id,
            net_payable = %record.net_payable,
            warnings = record.audit_trace.warnings.len(),
            regenerated = existing.is_some(),
            duration_us = started.elapsed().as_micros(),
            "Payroll generated"
        );
        Ok(PayrollOutcome::Generated {
            record: Box::new(record),
        })
    }

    /// Writes (or replaces) the holiday leave credit of this month.
    fn stage_holiday_credit(
        &self,
        unit: &mut UnitOfWork,
        user_id: &str,
        period: PayrollPeriod,
        rules: &PayrollRules,
        calculation: &PayrollCalculation,
        created_by: &str,
    ) -> EngineResult<()> {
        if rules.holiday.mode != HolidayCompensationMode::Leave {
            return Ok(());
        }
        let Some(category) = calculation.holiday_leave_category.clone() else {
            return Ok(());
        };
        let leave_rules = LeaveRules::resolve(self.ctx.config.as_ref(), period.last_day())?;
        let key = CreditKey {
            user_id: user_id.to_string(),
            category,
            financial_year: leave_rules.financial_year.label(),
            month: Some(period.month),
            source: CreditSource::HolidayCredit,
        };
        if self.ctx.store.ledger_entry(&key)?.is_some() {
            unit.leave_reversals.push(key.clone());
        }
        if calculation.holiday_leaves_credited > Decimal::ZERO {
            unit.leave_credits.push(LeaveLedgerEntry {
                notes: format!(
                    "{} day(s) for {} holiday(s) worked in {}",
                    calculation.holiday_leaves_credited.normalize(),
                    calculation.attendance.holidays_worked,
                    period
                ),
                key,
                days: calculation.holiday_leaves_credited,
                created_by: created_by.to_string(),
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    /// GENERATED → APPROVED. Itemized bonuses become PAID in the same commit.
    ///
    /// Refused for the exit month of a live settlement, which pays that month
    /// itself.
    pub fn approve_payroll(&self, payroll_id: &str, approved_by: &str) -> EngineResult<PayrollRecord> {
        let previous = self.load(payroll_id)?;
        let mut record = previous.clone();
        record.status = previous.status.transition(PayrollStatus::Approved)?;
        let settled = self
            .ctx
            .store
            .settlement(&record.user_id)?
            .filter(|s| s.status != FnfStatus::Cancelled)
            .is_some_and(|s| PayrollPeriod::containing(s.exit_date) == record.period());
        if settled {
            return Err(EngineError::FinalMonthSettled {
                user_id: record.user_id.clone(),
                month: record.month,
                year: record.year,
            });
        }
        let now = Utc::now();
        record.approved_by = Some(approved_by.to_string());
        record.approved_at = Some(now);
        record.updated_at = now;

        let stored = self.ctx.store.bonuses_for(&record.user_id, record.period())?;
        let updated: Vec<Bonus> = stored
            .iter()
            .cloned()
            .map(|mut bonus| {
                let itemized = record.bonus_details.iter().any(|d| d.bonus_id == bonus.id);
                if itemized
                    && bonus.consumed_by.as_deref() == Some(payroll_id)
                    && bonus.status == BonusStatus::Pending
                {
                    bonus.status = BonusStatus::Paid;
                }
                bonus
            })
            .collect();

        self.commit_transition(previous, record, ChangeAction::Approve, &stored, updated, approved_by)
    }

    /// APPROVED → PAID.
    pub fn mark_payroll_paid(&self, payroll_id: &str, paid_by: &str) -> EngineResult<PayrollRecord> {
        let previous = self.load(payroll_id)?;
        let mut record = previous.clone();
        record.status = previous.status.transition(PayrollStatus::Paid)?;
        let now = Utc::now();
        record.paid_at = Some(now);
        record.updated_at = now;
        self.commit_transition(previous, record, ChangeAction::Pay, &[], Vec::new(), paid_by)
    }

    /// Any non-PAID status → CANCELLED. Reserved bonuses are released.
    pub fn cancel_payroll(&self, payroll_id: &str, cancelled_by: &str) -> EngineResult<PayrollRecord> {
        let previous = self.load(payroll_id)?;
        let mut record = previous.clone();
        record.status = previous.status.transition(PayrollStatus::Cancelled)?;
        record.updated_at = Utc::now();

        let stored = self.ctx.store.bonuses_for(&record.user_id, record.period())?;
        let updated: Vec<Bonus> = stored
            .iter()
            .cloned()
            .map(|mut bonus| {
                if bonus.consumed_by.as_deref() == Some(payroll_id) {
                    bonus.consumed_by = None;
                    if bonus.status == BonusStatus::Paid {
                        bonus.status = BonusStatus::Pending;
                    }
                }
                bonus
            })
            .collect();

        self.commit_transition(previous, record, ChangeAction::Cancel, &stored, updated, cancelled_by)
    }

    fn load(&self, payroll_id: &str) -> EngineResult<PayrollRecord> {
        self.ctx
            .store
            .payroll_by_id(payroll_id)?
            .ok_or_else(|| EngineError::PayrollNotFound {
                payroll_id: payroll_id.to_string(),
            })
    }

    fn commit_transition(
        &self,
        previous: PayrollRecord,
        record: PayrollRecord,
        action: ChangeAction,
        stored_bonuses: &[Bonus],
        bonuses: Vec<Bonus>,
        actor: &str,
    ) -> EngineResult<PayrollRecord> {
        let mut unit = UnitOfWork::new();
        stage_bonus_changes(&mut unit, stored_bonuses, bonuses, actor);
        unit.audit.push(ChangeLogEntry::capture(
            ENTITY,
            &record.id,
            action,
            Some(&previous),
            &record,
            actor,
        ));
        unit.payrolls.push(record.clone());
        self.ctx.store.commit(unit)?;

        info!(
            payroll_id = %record.id,
            user_id = %record.user_id,
            from = %previous.status,
            to = %record.status,
            actor,
            "Payroll status changed"
        );
        Ok(record)
    }
}

fn skipped(user_id: &str, reason: String) -> PayrollOutcome {
    PayrollOutcome::Skipped {
        user_id: user_id.to_string(),
        reason,
    }
}

/// Stages the bonuses that differ from their stored state, with audit entries.
pub(super) fn stage_bonus_changes(
    unit: &mut UnitOfWork,
    stored: &[Bonus],
    updated: Vec<Bonus>,
    actor: &str,
) {
    for bonus in updated {
        let Some(before) = stored.iter().find(|b| b.id == bonus.id) else {
            continue;
        };
        if before == &bonus {
            continue;
        }
        let action = if bonus.status == BonusStatus::Paid && before.status != BonusStatus::Paid {
            ChangeAction::Pay
        } else {
            ChangeAction::Update
        };
        unit.audit.push(ChangeLogEntry::capture(
            "Bonus",
            &bonus.id,
            action,
            Some(before),
            &bonus,
            actor,
        ));
        unit.bonuses.push(bonus);
    }
}
