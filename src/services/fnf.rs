//! Full-and-final settlement: calculation, clearances and workflow.

use std::time::Instant;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::calculation::{
    FinalMonthInput, FnfInput, calculate_fnf, check_clearance_gate, resolve_salary_structure,
};
use crate::config::{FnfRules, LeaveRules, PayrollRules};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Bonus, BonusStatus, ChangeAction, ChangeLogEntry, ClearanceKind, ClearanceStatus, CreditKey,
    CreditSource, ExitReason, FnfSettlement, FnfStatus, LeaveLedgerEntry, PayrollPeriod,
    PayrollStatus,
};
use crate::store::UnitOfWork;

use super::payroll::stage_bonus_changes;
use super::{EngineContext, prepend_step};

const ENTITY: &str = "FnfSettlement";

/// An exit to settle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FnfRequest {
    /// The exiting employee.
    pub user_id: String,
    /// Last working day.
    pub exit_date: NaiveDate,
    /// Why the employee is leaving.
    pub exit_reason: ExitReason,
    /// When notice was given.
    #[serde(default)]
    pub resignation_date: Option<NaiveDate>,
    /// Whether HR waived any notice shortfall.
    #[serde(default)]
    pub notice_waived: bool,
}

/// Computes settlements and moves them through their workflow.
#[derive(Clone)]
pub struct FnfService {
    ctx: EngineContext,
}

impl FnfService {
    /// Creates the service.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Calculates (or recalculates) the settlement of an exiting user.
    ///
    /// Recalculation reuses the settlement id and replaces the previous
    /// leave-encashment debits. It is refused once the settlement is
    /// approved. An exit-month payroll that is not yet approved is cancelled
    /// in the same commit and its bonuses move to the settlement.
    pub fn calculate_fnf(&self, request: &FnfRequest, calculated_by: &str) -> EngineResult<FnfSettlement> {
        let started = Instant::now();
        let user_id = request.user_id.as_str();
        if let Some(resigned) = request.resignation_date {
            if resigned > request.exit_date {
                return Err(EngineError::invalid_input(
                    "resignation_date",
                    "must not be after the exit date",
                ));
            }
        }
        let employee = self
            .ctx
            .directory
            .employee(user_id)?
            .ok_or_else(|| EngineError::EmployeeNotFound {
                user_id: user_id.to_string(),
            })?;
        if request.exit_date < employee.date_of_joining {
            return Err(EngineError::invalid_input(
                "exit_date",
                "must not be before the date of joining",
            ));
        }

        let existing = self.ctx.store.settlement(user_id)?;
        if let Some(settlement) = &existing {
            if !settlement.status.allows_recalculation() {
                return Err(EngineError::SettlementLocked {
                    user_id: user_id.to_string(),
                    status: settlement.status.to_string(),
                });
            }
        }

        let config = self.ctx.config.as_ref();
        let payroll_rules = PayrollRules::resolve(config, request.exit_date)?;
        let fnf_rules = FnfRules::resolve(config, request.exit_date)?;
        let leave_rules = LeaveRules::resolve(config, request.exit_date)?;

        let history = self.ctx.store.salary_history(user_id)?;
        let lookup = resolve_salary_structure(user_id, &history, request.exit_date, 1)?;

        let settlement_id = existing
            .as_ref()
            .map(|s| s.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let period = PayrollPeriod::containing(request.exit_date);
        let exit_payroll = self.ctx.store.find_payroll(user_id, period)?;
        let exit_month_settled = exit_payroll
            .as_ref()
            .is_some_and(|p| matches!(p.status, PayrollStatus::Approved | PayrollStatus::Paid));
        // A payroll not yet approved is replaced by the final-month salary.
        let superseded = exit_payroll
            .filter(|p| matches!(p.status, PayrollStatus::Draft | PayrollStatus::Generated));
        let superseded_id = superseded.as_ref().map(|p| p.id.clone());
        let reserved_by_payroll = |bonus: &Bonus| {
            bonus.consumed_by.is_some() && bonus.consumed_by == superseded_id
        };
        let stored_bonuses = self.ctx.store.bonuses_for(user_id, period)?;
        let available_bonuses: Vec<Bonus> = stored_bonuses
            .iter()
            .cloned()
            .map(|mut bonus| {
                if reserved_by_payroll(&bonus) {
                    bonus.consumed_by = None;
                }
                bonus
            })
            .collect();
        let attendance = if exit_month_settled {
            None
        } else {
            Some(self.ctx.attendance.monthly_summary(user_id, period)?)
        };

        // Encashment works on balances as they were before any earlier debit
        // from this settlement.
        let financial_year = leave_rules.financial_year.label();
        let mut balances = self.ctx.store.leave_balances(user_id, &financial_year)?;
        let mut reversals = Vec::new();
        for balance in balances.iter_mut() {
            let key = encashment_key(user_id, &balance.category, &financial_year);
            if let Some(previous) = self.ctx.store.ledger_entry(&key)? {
                balance.revert(&previous);
                reversals.push(key);
            }
        }

        let reimbursements = self.ctx.expenses.pending_reimbursements(user_id)?;
        let advances = self.ctx.expenses.outstanding_advances(user_id)?;

        let calculation = calculate_fnf(FnfInput {
            employee: &employee,
            exit_date: request.exit_date,
            exit_reason: request.exit_reason,
            resignation_date: request.resignation_date,
            notice_waived: request.notice_waived,
            structure: &lookup.structure,
            final_month: attendance.as_ref().map(|attendance| FinalMonthInput {
                attendance,
                bonuses: &available_bonuses,
            }),
            settlement_id: Some(&settlement_id),
            leave_balances: &balances,
            leave_categories: &leave_rules.categories,
            reimbursements: &reimbursements,
            advances: &advances,
            payroll_rules: &payroll_rules,
            fnf_rules: &fnf_rules,
        });

        let mut breakdown = calculation.breakdown;
        breakdown.audit_trace = prepend_step(lookup.audit_step, breakdown.audit_trace);

        let now = Utc::now();
        let mut unit = UnitOfWork::new();
        unit.leave_reversals = reversals;
        unit.leave_credits = breakdown
            .leave_encashment
            .iter()
            .map(|line| LeaveLedgerEntry {
                key: encashment_key(user_id, &line.category, &line.financial_year),
                days: line.days,
                notes: format!(
                    "Encashed {} day(s) in settlement {}",
                    line.days.normalize(),
                    settlement_id
                ),
                created_by: calculated_by.to_string(),
                created_at: now,
            })
            .collect();

        let bonuses: Vec<Bonus> = available_bonuses
            .into_iter()
            .map(|mut bonus| {
                if calculation.bonus_ids.contains(&bonus.id) {
                    bonus.consumed_by = Some(settlement_id.clone());
                } else if bonus.consumed_by.as_deref() == Some(settlement_id.as_str()) {
                    bonus.consumed_by = None;
                }
                bonus
            })
            .collect();
        stage_bonus_changes(&mut unit, &stored_bonuses, bonuses, calculated_by);

        if let Some(previous) = superseded {
            let mut cancelled = previous.clone();
            cancelled.status = previous.status.transition(PayrollStatus::Cancelled)?;
            cancelled.updated_at = now;
            unit.audit.push(ChangeLogEntry::capture(
                "Payroll",
                &cancelled.id,
                ChangeAction::Cancel,
                Some(&previous),
                &cancelled,
                calculated_by,
            ));
            unit.payrolls.push(cancelled);
        }

        let status = match existing.as_ref().map(|s| s.status) {
            None | Some(FnfStatus::Initiated) | Some(FnfStatus::Cancelled) => FnfStatus::Calculated,
            Some(status) => status,
        };
        let settlement = FnfSettlement {
            id: settlement_id.clone(),
            user_id: user_id.to_string(),
            status,
            exit_date: request.exit_date,
            exit_reason: request.exit_reason,
            resignation_date: request.resignation_date,
            final_salary: calculation.final_salary,
            leave_encashment_amount: calculation.leave_encashment_amount,
            gratuity_amount: calculation.gratuity_amount,
            notice_period_recovery: calculation.notice_period_recovery,
            reimbursements_total: calculation.reimbursements_total,
            advances_total: calculation.advances_total,
            total_earnings: breakdown.total_earnings,
            total_deductions: breakdown.total_deductions,
            net_payable: breakdown.net_payable,
            clearances: existing
                .as_ref()
                .map(|s| s.clearances.clone())
                .unwrap_or_default(),
            salary_breakdown: breakdown,
            config_snapshot: serde_json::json!({
                "payroll": payroll_rules,
                "fnf": fnf_rules,
                "leave": leave_rules,
            }),
            bonus_ids: calculation.bonus_ids,
            calculated_by: calculated_by.to_string(),
            calculated_at: now,
            updated_at: now,
        };

        let action = if existing.is_some() {
            ChangeAction::Regenerate
        } else {
            ChangeAction::Create
        };
        unit.audit.push(ChangeLogEntry::capture(
            ENTITY,
            &settlement.id,
            action,
            existing.as_ref(),
            &settlement,
            calculated_by,
        ));
        unit.settlements.push(settlement.clone());
        self.ctx.store.commit(unit)?;

        info!(
            user_id,
            settlement_id = %settlement.id,
            net_payable = %settlement.net_payable,
            final_month_paid_separately = exit_month_settled,
            superseded_payroll = superseded_id.as_deref().unwrap_or("-"),
            duration_us = started.elapsed().as_micros(),
            "Settlement calculated"
        );
        Ok(settlement)
    }

    /// Records the outcome of one clearance.
    pub fn update_clearance(
        &self,
        user_id: &str,
        kind: ClearanceKind,
        status: ClearanceStatus,
        updated_by: &str,
    ) -> EngineResult<FnfSettlement> {
        let previous = self.load(user_id)?;
        if matches!(previous.status, FnfStatus::Completed | FnfStatus::Cancelled) {
            return Err(EngineError::SettlementLocked {
                user_id: user_id.to_string(),
                status: previous.status.to_string(),
            });
        }
        let mut settlement = previous.clone();
        settlement.clearances.set(kind, status);
        settlement.updated_at = Utc::now();

        let mut unit = UnitOfWork::new();
        self.stage(&mut unit, &previous, &settlement, ChangeAction::Update, updated_by);
        self.ctx.store.commit(unit)?;
        info!(user_id, clearance = kind.as_str(), status = ?status, "Clearance updated");
        Ok(settlement)
    }

    /// Moves the settlement to `target`.
    ///
    /// Leaving `PENDING_CLEARANCE` requires every blocking clearance to be
    /// resolved. Reaching `APPROVED` pays the bonuses the settlement
    /// reserved; cancelling releases them and reverses encashment debits.
    pub fn advance_fnf(&self, user_id: &str, target: FnfStatus, actor: &str) -> EngineResult<FnfSettlement> {
        let previous = self.load(user_id)?;
        let next = previous.status.transition(target)?;
        if previous.status == FnfStatus::PendingClearance && next != FnfStatus::Cancelled {
            let rules = FnfRules::resolve(self.ctx.config.as_ref(), previous.exit_date)?;
            check_clearance_gate(user_id, &previous.clearances, &rules.clearance)?;
        }

        let mut settlement = previous.clone();
        settlement.status = next;
        settlement.updated_at = Utc::now();

        let mut unit = UnitOfWork::new();
        let period = PayrollPeriod::containing(previous.exit_date);
        let stored = self.ctx.store.bonuses_for(user_id, period)?;
        let reserved = |bonus: &Bonus| bonus.consumed_by.as_deref() == Some(previous.id.as_str());
        let action = match next {
            FnfStatus::Approved => {
                let paid: Vec<Bonus> = stored
                    .iter()
                    .cloned()
                    .map(|mut bonus| {
                        if reserved(&bonus) && bonus.status == BonusStatus::Pending {
                            bonus.status = BonusStatus::Paid;
                        }
                        bonus
                    })
                    .collect();
                stage_bonus_changes(&mut unit, &stored, paid, actor);
                ChangeAction::Approve
            }
            FnfStatus::Cancelled => {
                let released: Vec<Bonus> = stored
                    .iter()
                    .cloned()
                    .map(|mut bonus| {
                        if reserved(&bonus) {
                            bonus.consumed_by = None;
                            bonus.status = BonusStatus::Pending;
                        }
                        bonus
                    })
                    .collect();
                stage_bonus_changes(&mut unit, &stored, released, actor);
                unit.leave_reversals = previous
                    .salary_breakdown
                    .leave_encashment
                    .iter()
                    .map(|line| encashment_key(user_id, &line.category, &line.financial_year))
                    .collect();
                ChangeAction::Cancel
            }
            _ => ChangeAction::Update,
        };

        self.stage(&mut unit, &previous, &settlement, action, actor);
        self.ctx.store.commit(unit)?;
        info!(
            user_id,
            settlement_id = %settlement.id,
            from = %previous.status,
            to = %settlement.status,
            actor,
            "Settlement status changed"
        );
        Ok(settlement)
    }

    fn load(&self, user_id: &str) -> EngineResult<FnfSettlement> {
        self.ctx
            .store
            .settlement(user_id)?
            .ok_or_else(|| EngineError::SettlementNotFound {
                user_id: user_id.to_string(),
            })
    }

    fn stage(
        &self,
        unit: &mut UnitOfWork,
        previous: &FnfSettlement,
        settlement: &FnfSettlement,
        action: ChangeAction,
        actor: &str,
    ) {
        unit.audit.push(ChangeLogEntry::capture(
            ENTITY,
            &settlement.id,
            action,
            Some(previous),
            settlement,
            actor,
        ));
        unit.settlements.push(settlement.clone());
    }
}

fn encashment_key(user_id: &str, category: &str, financial_year: &str) -> CreditKey {
    CreditKey {
        user_id: user_id.to_string(),
        category: category.to_string(),
        financial_year: financial_year.to_string(),
        month: None,
        source: CreditSource::FnfEncashment,
    }
}
