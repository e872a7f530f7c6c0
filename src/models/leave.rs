//! Leave balances and the credit ledger that feeds them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a leave ledger entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditSource {
    /// Pro-rata allocation on joining.
    JoiningCredit,
    /// Periodic monthly accrual.
    MonthlyAccrual,
    /// Periodic quarterly accrual.
    QuarterlyAccrual,
    /// Full-year allocation at the start of the financial year.
    AnnualCredit,
    /// Unused balance brought over from the previous financial year.
    CarryForward,
    /// Compensatory leave for working on a public holiday.
    HolidayCredit,
    /// Debit for leave paid out in a full-and-final settlement.
    FnfEncashment,
}

impl CreditSource {
    /// Stable snake_case tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditSource::JoiningCredit => "joining_credit",
            CreditSource::MonthlyAccrual => "monthly_accrual",
            CreditSource::QuarterlyAccrual => "quarterly_accrual",
            CreditSource::AnnualCredit => "annual_credit",
            CreditSource::CarryForward => "carry_forward",
            CreditSource::HolidayCredit => "holiday_credit",
            CreditSource::FnfEncashment => "fnf_encashment",
        }
    }
}

/// Natural uniqueness key of a ledger entry.
///
/// Re-applying an entry with the same key is a no-op, which is what makes
/// accrual runs safe to repeat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreditKey {
    /// The employee.
    pub user_id: String,
    /// Leave category code.
    pub category: String,
    /// Financial year label.
    pub financial_year: String,
    /// Calendar month for periodic entries.
    pub month: Option<u32>,
    /// Entry source.
    pub source: CreditSource,
}

impl fmt::Display for CreditKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.user_id,
            self.category,
            self.financial_year,
            self.month.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string()),
            self.source.as_str()
        )
    }
}

/// An immutable entry in the leave ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveLedgerEntry {
    /// Idempotency key.
    pub key: CreditKey,
    /// Days credited (or debited, for [`CreditSource::FnfEncashment`]).
    pub days: Decimal,
    /// Human-readable provenance.
    pub notes: String,
    /// Who triggered the entry.
    pub created_by: String,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// Per (user, category, financial year) allocation ledger totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalance {
    /// The employee.
    pub user_id: String,
    /// Leave category code.
    pub category: String,
    /// Financial year label.
    pub financial_year: String,
    /// Days allocated in this year.
    pub total_allocated: Decimal,
    /// Days brought forward from the previous year.
    #[serde(default)]
    pub carried_forward: Decimal,
    /// Days used.
    #[serde(default)]
    pub consumed: Decimal,
    /// Manual adjustments (may be negative).
    #[serde(default)]
    pub adjusted: Decimal,
    /// Provenance of the most recent entry.
    #[serde(default)]
    pub notes: Option<String>,
    /// Source of the most recent entry.
    #[serde(default)]
    pub credit_source: Option<CreditSource>,
}

impl LeaveBalance {
    /// An empty balance.
    pub fn new(
        user_id: impl Into<String>,
        category: impl Into<String>,
        financial_year: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            category: category.into(),
            financial_year: financial_year.into(),
            total_allocated: Decimal::ZERO,
            carried_forward: Decimal::ZERO,
            consumed: Decimal::ZERO,
            adjusted: Decimal::ZERO,
            notes: None,
            credit_source: None,
        }
    }

    /// `total_allocated + carried_forward + adjusted − consumed`. May be negative.
    pub fn available(&self) -> Decimal {
        self.total_allocated + self.carried_forward + self.adjusted - self.consumed
    }

    /// True when more leave was consumed than the ledger allows.
    pub fn is_overconsumed(&self) -> bool {
        self.available() < Decimal::ZERO
    }

    /// Folds a ledger entry into the totals.
    pub fn apply(&mut self, entry: &LeaveLedgerEntry) {
        match entry.key.source {
            CreditSource::CarryForward => self.carried_forward += entry.days,
            CreditSource::FnfEncashment => self.consumed += entry.days,
            _ => self.total_allocated += entry.days,
        }
        self.notes = Some(entry.notes.clone());
        self.credit_source = Some(entry.key.source);
    }

    /// Reverses a previously applied ledger entry.
    pub fn revert(&mut self, entry: &LeaveLedgerEntry) {
        match entry.key.source {
            CreditSource::CarryForward => self.carried_forward -= entry.days,
            CreditSource::FnfEncashment => self.consumed -= entry.days,
            _ => self.total_allocated -= entry.days,
        }
    }
}

/// A category successfully credited for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCredit {
    /// Leave category code.
    pub category: String,
    /// Days credited.
    pub days: Decimal,
    /// Provenance string written to the balance.
    pub notes: String,
    /// False when the idempotency key had already been applied.
    pub newly_applied: bool,
}

/// A category that could not be credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryError {
    /// Leave category code, or `*` when the whole run aborted.
    pub category: String,
    /// What went wrong.
    pub message: String,
}

/// Per-user result of a leave credit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveCreditResult {
    /// The employee.
    pub user_id: String,
    /// Financial year label the credits landed in.
    pub financial_year: Option<String>,
    /// Categories credited (including idempotent repeats).
    pub categories_credited: Vec<CategoryCredit>,
    /// Categories skipped with the reason (e.g. zero quota).
    pub categories_skipped: Vec<CategoryError>,
    /// Categories that failed.
    pub errors: Vec<CategoryError>,
}

impl LeaveCreditResult {
    /// An empty result for `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            financial_year: None,
            categories_credited: Vec::new(),
            categories_skipped: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// True when no category failed.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn entry(source: CreditSource, days: &str) -> LeaveLedgerEntry {
        LeaveLedgerEntry {
            key: CreditKey {
                user_id: "emp_001".to_string(),
                category: "EL".to_string(),
                financial_year: "2025-2026".to_string(),
                month: None,
                source,
            },
            days: dec(days),
            notes: "test".to_string(),
            created_by: "system".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_apply_routes_by_source() {
        let mut balance = LeaveBalance::new("emp_001", "EL", "2025-2026");
        balance.apply(&entry(CreditSource::JoiningCredit, "9"));
        balance.apply(&entry(CreditSource::CarryForward, "5"));
        balance.apply(&entry(CreditSource::FnfEncashment, "3"));

        assert_eq!(balance.total_allocated, dec("9"));
        assert_eq!(balance.carried_forward, dec("5"));
        assert_eq!(balance.consumed, dec("3"));
        assert_eq!(balance.available(), dec("11"));
        assert_eq!(balance.credit_source, Some(CreditSource::FnfEncashment));
    }

    #[test]
    fn test_revert_undoes_apply() {
        let mut balance = LeaveBalance::new("emp_001", "EL", "2025-2026");
        let debit = entry(CreditSource::FnfEncashment, "4");
        balance.apply(&debit);
        balance.revert(&debit);
        assert_eq!(balance.consumed, Decimal::ZERO);
    }

    #[test]
    fn test_overconsumption_is_flagged_not_blocked() {
        let mut balance = LeaveBalance::new("emp_001", "CL", "2025-2026");
        balance.total_allocated = dec("2");
        balance.consumed = dec("3.5");
        assert!(balance.is_overconsumed());
        assert_eq!(balance.available(), dec("-1.5"));
    }

    #[test]
    fn test_credit_key_display() {
        let mut key = entry(CreditSource::MonthlyAccrual, "1").key;
        key.month = Some(7);
        assert_eq!(key.to_string(), "emp_001:EL:2025-2026:7:monthly_accrual");
    }
}
