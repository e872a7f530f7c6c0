//! Configuration resolution for the Compensation Engine.
//!
//! Business parameters are module-scoped, optionally keyed by a context such
//! as a financial-year label, and valid inside an optional date window. This
//! module loads them from YAML, resolves them for a date, and turns them into
//! the typed rule snapshots the calculators consume.
//!
//! # Example
//!
//! ```no_run
//! use compensation_engine::config::{ConfigLoader, PayrollRules};
//! use chrono::NaiveDate;
//!
//! let loader = ConfigLoader::load("./config/default").unwrap();
//! let as_of = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();
//! let rules = PayrollRules::resolve(loader.store(), as_of).unwrap();
//! println!("PF: {}%", rules.statutory.pf_employee_percentage);
//! ```

mod loader;
mod resolver;
mod rules;
mod types;

pub use loader::ConfigLoader;
pub use resolver::{ConfigResolver, ConfigStore, resolve_typed};
pub use rules::{
    BatchSettings, CalendarSettings, CarryForwardConfig, ClearanceConfig, CreditFrequency,
    DeductionBasis, EncashmentConfig, FnfRules, GratuityConfig, HolidayCompensationConfig,
    HolidayCompensationMode, JoinCredit, LeaveCategoryConfig, LeaveRules, MidMonthJoinPolicy,
    NoticeConfig, PayrollRules, StatutoryConfig,
};
pub use types::{ConfigSetting, ConfigValue, Configuration, ValueType};
