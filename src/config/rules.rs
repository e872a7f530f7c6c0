//! Typed rule snapshots resolved from configuration.
//!
//! Services resolve these once per operation and hand them to the pure
//! calculators, so a calculation is a function of its inputs and the
//! snapshot alone.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::models::FinancialYear;

use super::resolver::{ConfigResolver, resolve_typed};

/// Leave calendar configuration key.
pub const LEAVE_MODULE: &str = "leave";
/// Payroll configuration module.
pub const PAYROLL_MODULE: &str = "payroll";
/// FNF configuration module.
pub const FNF_MODULE: &str = "fnf";
/// Engine configuration module.
pub const ENGINE_MODULE: &str = "engine";

/// How much of the joining month is credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinCredit {
    /// The whole month counts.
    Full,
    /// Half the month counts.
    Half,
    /// The month does not count.
    None,
}

impl JoinCredit {
    /// The fraction of a month this policy credits.
    pub fn fraction(&self) -> Decimal {
        match self {
            JoinCredit::Full => Decimal::ONE,
            JoinCredit::Half => Decimal::new(5, 1),
            JoinCredit::None => Decimal::ZERO,
        }
    }
}

/// Join-month policy either side of the cutoff day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidMonthJoinPolicy {
    /// Applies when the joining day is on or before the cutoff.
    pub before_cutoff: JoinCredit,
    /// Applies when the joining day is after the cutoff.
    pub after_cutoff: JoinCredit,
}

/// Leave year calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSettings {
    /// First month of the leave year (1-12).
    pub start_month: u32,
    /// Last month of the leave year (1-12).
    pub end_month: u32,
    /// Last joining day that still counts as "before cutoff".
    pub joining_cutoff_day: u32,
    /// Join-month crediting policy.
    pub mid_month_join_policy: MidMonthJoinPolicy,
    /// Keep one decimal place instead of flooring to whole days.
    #[serde(default)]
    pub allow_fractional: bool,
}

impl CalendarSettings {
    fn validate(&self) -> Result<(), String> {
        if !(1..=12).contains(&self.start_month) || !(1..=12).contains(&self.end_month) {
            return Err("start_month and end_month must be 1-12".to_string());
        }
        if (self.start_month + 10) % 12 + 1 != self.end_month {
            return Err(format!(
                "a year starting in month {} must end in month {}",
                self.start_month,
                (self.start_month + 10) % 12 + 1
            ));
        }
        if !(1..=31).contains(&self.joining_cutoff_day) {
            return Err("joining_cutoff_day must be 1-31".to_string());
        }
        Ok(())
    }

    /// The financial year containing `date`.
    pub fn financial_year(&self, date: NaiveDate) -> FinancialYear {
        FinancialYear::containing(date, self.start_month)
    }
}

/// How often a leave category is credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditFrequency {
    /// `quota / 12` every month.
    Monthly,
    /// `quota / 4` at the start of every quarter.
    Quarterly,
    /// Full quota at the start of the year.
    Yearly,
    /// Pro-rata on joining, then the full quota at the start of each later year.
    ProRata,
}

/// Carry-forward rules of a category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryForwardConfig {
    /// Whether unused days move to the next year.
    #[serde(default)]
    pub enabled: bool,
    /// Maximum days carried; unlimited when absent.
    #[serde(default)]
    pub max_days: Option<Decimal>,
}

/// One leave category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveCategoryConfig {
    /// Category code, e.g. `EL`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Days per full year.
    pub annual_quota: Decimal,
    /// Credit cadence.
    pub credit_frequency: CreditFrequency,
    /// Carry-forward rules.
    #[serde(default)]
    pub carry_forward: CarryForwardConfig,
    /// Whether unused days are paid out on exit.
    #[serde(default)]
    pub encashable: bool,
    /// Cap on days paid out on exit.
    #[serde(default)]
    pub max_encashable_days: Option<Decimal>,
}

/// Everything the leave calculators need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaveRules {
    /// Calendar in force.
    pub calendar: CalendarSettings,
    /// Financial year the calendar was resolved for.
    pub financial_year: FinancialYear,
    /// Configured categories.
    pub categories: Vec<LeaveCategoryConfig>,
}

impl LeaveRules {
    /// Resolves the calendar and categories in force on `as_of`.
    ///
    /// The context-free calendar determines where the financial year starts;
    /// a calendar keyed by that year's label then overrides it if present.
    pub fn resolve(resolver: &dyn ConfigResolver, as_of: NaiveDate) -> EngineResult<Self> {
        let base: CalendarSettings =
            resolve_typed(resolver, LEAVE_MODULE, "calendar_settings", None, as_of)?;
        let financial_year = base.financial_year(as_of);
        let label = financial_year.label();
        let calendar: CalendarSettings = resolve_typed(
            resolver,
            LEAVE_MODULE,
            "calendar_settings",
            Some(&label),
            as_of,
        )?;
        calendar
            .validate()
            .map_err(|message| EngineError::ConfigValueMismatch {
                module: LEAVE_MODULE.to_string(),
                key: "calendar_settings".to_string(),
                expected: "calendar settings".to_string(),
                message,
            })?;

        let categories: Vec<LeaveCategoryConfig> =
            resolve_typed(resolver, LEAVE_MODULE, "categories", Some(&label), as_of)?;

        Ok(Self {
            calendar,
            financial_year: calendar.financial_year(as_of),
            categories,
        })
    }

    /// Looks up a category by code.
    pub fn category(&self, code: &str) -> Option<&LeaveCategoryConfig> {
        self.categories.iter().find(|c| c.code == code)
    }
}

/// Whether statutory deductions come from the structure or from percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionBasis {
    /// Use the amounts stored on the salary structure, unprorated.
    Structure,
    /// Compute PF and ESIC as percentages of prorated pay.
    Percentage,
}

/// Statutory deduction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryConfig {
    /// Source of PF/ESIC amounts.
    pub deduction_basis: DeductionBasis,
    /// Employee PF, percent of PF wages.
    #[serde(default)]
    pub pf_employee_percentage: Decimal,
    /// Employer PF, percent of PF wages.
    #[serde(default)]
    pub pf_employer_percentage: Decimal,
    /// Maximum basic on which PF is computed; uncapped when absent.
    #[serde(default)]
    pub pf_wage_ceiling: Option<Decimal>,
    /// Employee ESIC, percent of prorated gross.
    #[serde(default)]
    pub esic_employee_percentage: Decimal,
    /// ESIC applies only while prorated gross is at or below this limit.
    #[serde(default)]
    pub esic_gross_limit: Option<Decimal>,
    /// Flat monthly professional tax; the structure's amount when absent.
    #[serde(default)]
    pub professional_tax: Option<Decimal>,
    /// Deduct loss of pay for unpaid leave days.
    #[serde(default = "default_true")]
    pub apply_lop_deduction: bool,
}

fn default_true() -> bool {
    true
}

/// How holidays worked are compensated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayCompensationMode {
    /// Counted as payable days.
    None,
    /// Paid as a money credit.
    Bonus,
    /// Credited as compensatory leave.
    Leave,
}

/// Holiday-work compensation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCompensationConfig {
    /// Compensation mode.
    pub mode: HolidayCompensationMode,
    /// Multiplier on the daily basic rate in `bonus` mode.
    #[serde(default = "default_one")]
    pub bonus_multiplier: Decimal,
    /// Days credited per holiday worked in `leave` mode.
    #[serde(default = "default_one")]
    pub leaves_per_holiday: Decimal,
    /// Leave category credited in `leave` mode.
    #[serde(default)]
    pub leave_category: Option<String>,
}

fn default_one() -> Decimal {
    Decimal::ONE
}

/// Everything the payroll calculator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollRules {
    /// Statutory deductions.
    pub statutory: StatutoryConfig,
    /// Holiday-work compensation.
    pub holiday: HolidayCompensationConfig,
}

impl PayrollRules {
    /// Resolves payroll rules in force on `as_of`.
    pub fn resolve(resolver: &dyn ConfigResolver, as_of: NaiveDate) -> EngineResult<Self> {
        let statutory: StatutoryConfig =
            resolve_typed(resolver, PAYROLL_MODULE, "statutory", None, as_of)?;
        let holiday: HolidayCompensationConfig =
            resolve_typed(resolver, PAYROLL_MODULE, "holiday_compensation", None, as_of)?;

        if holiday.mode == HolidayCompensationMode::Leave && holiday.leave_category.is_none() {
            return Err(EngineError::ConfigValueMismatch {
                module: PAYROLL_MODULE.to_string(),
                key: "holiday_compensation".to_string(),
                expected: "leave_category for leave mode".to_string(),
                message: "leave mode requires leave_category".to_string(),
            });
        }

        Ok(Self { statutory, holiday })
    }
}

/// Gratuity parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GratuityConfig {
    /// Minimum completed years for eligibility.
    pub min_service_years: u32,
    /// Days of wages per year of service.
    pub days_per_year: Decimal,
    /// Working days per month used to derive the daily wage.
    pub divisor: Decimal,
    /// Statutory maximum; uncapped when absent.
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// A partial year of at least this many months counts as a full year.
    #[serde(default)]
    pub round_up_after_months: Option<u32>,
}

/// Leave encashment parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncashmentConfig {
    /// Days per month used to derive the daily salary from basic.
    pub daily_divisor: Decimal,
}

/// Notice period parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeConfig {
    /// Notice owed on resignation.
    pub period_days: u32,
    /// Whether a shortfall is waived by policy.
    #[serde(default)]
    pub waiver_allowed: bool,
}

/// Which clearances block settlement approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceConfig {
    /// Asset clearance blocks.
    #[serde(default = "default_true")]
    pub assets_blocking: bool,
    /// Vehicle clearance blocks.
    #[serde(default = "default_true")]
    pub vehicles_blocking: bool,
    /// Card clearance blocks.
    #[serde(default = "default_true")]
    pub cards_blocking: bool,
}

/// Everything the settlement calculator needs beyond payroll rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FnfRules {
    /// Gratuity.
    pub gratuity: GratuityConfig,
    /// Leave encashment.
    pub encashment: EncashmentConfig,
    /// Notice period.
    pub notice: NoticeConfig,
    /// Clearance gating.
    pub clearance: ClearanceConfig,
}

impl FnfRules {
    /// Resolves settlement rules in force on `as_of`.
    pub fn resolve(resolver: &dyn ConfigResolver, as_of: NaiveDate) -> EngineResult<Self> {
        let rules: FnfRules = resolve_typed(resolver, FNF_MODULE, "settings", None, as_of)?;
        if rules.gratuity.divisor <= Decimal::ZERO || rules.encashment.daily_divisor <= Decimal::ZERO
        {
            return Err(EngineError::ConfigValueMismatch {
                module: FNF_MODULE.to_string(),
                key: "settings".to_string(),
                expected: "positive divisors".to_string(),
                message: "gratuity.divisor and encashment.daily_divisor must be positive"
                    .to_string(),
            });
        }
        Ok(rules)
    }
}

/// Worker pool settings for batch jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Users processed concurrently.
    pub max_workers: usize,
    /// Budget for one user's unit of work.
    pub per_user_timeout_ms: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_workers: 8,
            per_user_timeout_ms: 5_000,
        }
    }
}

impl BatchSettings {
    /// Resolves batch settings, falling back to defaults when not configured.
    pub fn resolve(resolver: &dyn ConfigResolver, as_of: NaiveDate) -> Self {
        match resolve_typed::<BatchSettings>(resolver, ENGINE_MODULE, "batch", None, as_of) {
            Ok(settings) if settings.max_workers > 0 => settings,
            Ok(_) => {
                warn!("engine/batch max_workers is zero, using defaults");
                Self::default()
            }
            Err(err) => {
                warn!(error = %err, "engine/batch not configured, using defaults");
                Self::default()
            }
        }
    }

    /// Per-user timeout as a [`Duration`].
    pub fn per_user_timeout(&self) -> Duration {
        Duration::from_millis(self.per_user_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, ValueType};
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn add(store: &mut ConfigStore, module: &str, key: &str, ty: ValueType, ctx: Option<&str>, value: serde_json::Value) {
        let id = store.add_configuration(module, key, ty).unwrap();
        store.add_setting(&id, ctx, value, None, None, true).unwrap();
    }

    fn calendar(cutoff: u32) -> serde_json::Value {
        json!({
            "start_month": 4,
            "end_month": 3,
            "joining_cutoff_day": cutoff,
            "mid_month_join_policy": {"before_cutoff": "full", "after_cutoff": "half"},
            "allow_fractional": false
        })
    }

    #[test]
    fn test_leave_rules_prefer_fy_context() {
        let mut store = ConfigStore::new();
        add(&mut store, "leave", "calendar_settings", ValueType::Json, None, calendar(15));
        add(&mut store, "leave", "calendar_settings", ValueType::Json, Some("2025-2026"), calendar(10));
        add(
            &mut store,
            "leave",
            "categories",
            ValueType::Array,
            None,
            json!([{"code": "EL", "name": "Earned", "annual_quota": "18", "credit_frequency": "pro_rata"}]),
        );

        let rules = LeaveRules::resolve(&store, date(2025, 7, 1)).unwrap();
        assert_eq!(rules.calendar.joining_cutoff_day, 10);
        assert_eq!(rules.financial_year.label(), "2025-2026");
        assert_eq!(rules.categories.len(), 1);

        let rules = LeaveRules::resolve(&store, date(2024, 7, 1)).unwrap();
        assert_eq!(rules.calendar.joining_cutoff_day, 15);
    }

    #[test]
    fn test_leave_rules_missing_categories() {
        let mut store = ConfigStore::new();
        add(&mut store, "leave", "calendar_settings", ValueType::Json, None, calendar(15));
        assert!(matches!(
            LeaveRules::resolve(&store, date(2025, 7, 1)),
            Err(EngineError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_calendar_rejected() {
        let mut store = ConfigStore::new();
        let mut bad = calendar(15);
        bad["end_month"] = json!(12);
        add(&mut store, "leave", "calendar_settings", ValueType::Json, None, bad);
        add(&mut store, "leave", "categories", ValueType::Array, None, json!([]));
        assert!(matches!(
            LeaveRules::resolve(&store, date(2025, 7, 1)),
            Err(EngineError::ConfigValueMismatch { .. })
        ));
    }

    #[test]
    fn test_leave_mode_requires_category() {
        let mut store = ConfigStore::new();
        add(
            &mut store,
            "payroll",
            "statutory",
            ValueType::Json,
            None,
            json!({"deduction_basis": "structure"}),
        );
        add(
            &mut store,
            "payroll",
            "holiday_compensation",
            ValueType::Json,
            None,
            json!({"mode": "leave"}),
        );
        assert!(matches!(
            PayrollRules::resolve(&store, date(2025, 7, 1)),
            Err(EngineError::ConfigValueMismatch { .. })
        ));
    }

    #[test]
    fn test_statutory_defaults() {
        let mut store = ConfigStore::new();
        add(
            &mut store,
            "payroll",
            "statutory",
            ValueType::Json,
            None,
            json!({"deduction_basis": "percentage", "pf_employee_percentage": "12"}),
        );
        add(
            &mut store,
            "payroll",
            "holiday_compensation",
            ValueType::Json,
            None,
            json!({"mode": "bonus"}),
        );
        let rules = PayrollRules::resolve(&store, date(2025, 7, 1)).unwrap();
        assert!(rules.statutory.apply_lop_deduction);
        assert_eq!(rules.statutory.pf_wage_ceiling, None);
        assert_eq!(rules.holiday.bonus_multiplier, Decimal::ONE);
    }

    #[test]
    fn test_batch_settings_fall_back_to_default() {
        let store = ConfigStore::new();
        assert_eq!(BatchSettings::resolve(&store, date(2025, 1, 1)), BatchSettings::default());
    }

    #[test]
    fn test_join_credit_fractions() {
        assert_eq!(JoinCredit::Full.fraction(), Decimal::ONE);
        assert_eq!(JoinCredit::Half.fraction(), Decimal::new(5, 1));
        assert_eq!(JoinCredit::None.fraction(), Decimal::ZERO);
    }
}
