//! Salary structures and their revision history.
//!
//! A user's compensation is a chain of [`SalaryStructure`] versions. Only the
//! newest version is open-ended; every revision closes its predecessor and
//! leaves behind an immutable [`SalaryChangeLog`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// The kind of change that produced a salary structure version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementType {
    /// First structure on joining.
    Initial,
    /// Annual appraisal increment.
    Annual,
    /// Promotion.
    Promotion,
    /// Market or retention correction.
    Correction,
}

/// An earning component that is prorated by attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningComponent {
    /// Basic pay.
    Basic,
    /// House rent allowance.
    Hra,
    /// Conveyance allowance.
    Conveyance,
    /// Medical allowance.
    Medical,
    /// Special allowance.
    Special,
    /// Any other fixed allowance.
    Other,
}

impl EarningComponent {
    /// All components in payslip order.
    pub const ALL: [EarningComponent; 6] = [
        EarningComponent::Basic,
        EarningComponent::Hra,
        EarningComponent::Conveyance,
        EarningComponent::Medical,
        EarningComponent::Special,
        EarningComponent::Other,
    ];

    /// Stable snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            EarningComponent::Basic => "basic",
            EarningComponent::Hra => "hra",
            EarningComponent::Conveyance => "conveyance",
            EarningComponent::Medical => "medical",
            EarningComponent::Special => "special",
            EarningComponent::Other => "other",
        }
    }
}

/// The settable amounts of a salary structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryComponents {
    /// Monthly basic pay.
    pub basic: Decimal,
    /// House rent allowance.
    #[serde(default)]
    pub hra: Decimal,
    /// Conveyance allowance.
    #[serde(default)]
    pub conveyance_allowance: Decimal,
    /// Medical allowance.
    #[serde(default)]
    pub medical_allowance: Decimal,
    /// Special allowance.
    #[serde(default)]
    pub special_allowance: Decimal,
    /// Other allowances.
    #[serde(default)]
    pub other_allowances: Decimal,
    /// Employee provident fund contribution.
    #[serde(default)]
    pub employee_pf: Decimal,
    /// Employer provident fund contribution (part of CTC, not deducted).
    #[serde(default)]
    pub employer_pf: Decimal,
    /// Tax deducted at source.
    #[serde(default)]
    pub tds: Decimal,
    /// Employee state insurance contribution.
    #[serde(default)]
    pub esic: Decimal,
    /// Professional tax.
    #[serde(default)]
    pub professional_tax: Decimal,
}

impl SalaryComponents {
    /// Amount of a single earning component.
    pub fn earning(&self, component: EarningComponent) -> Decimal {
        match component {
            EarningComponent::Basic => self.basic,
            EarningComponent::Hra => self.hra,
            EarningComponent::Conveyance => self.conveyance_allowance,
            EarningComponent::Medical => self.medical_allowance,
            EarningComponent::Special => self.special_allowance,
            EarningComponent::Other => self.other_allowances,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        let fields = [
            ("basic", self.basic),
            ("hra", self.hra),
            ("conveyance_allowance", self.conveyance_allowance),
            ("medical_allowance", self.medical_allowance),
            ("special_allowance", self.special_allowance),
            ("other_allowances", self.other_allowances),
            ("employee_pf", self.employee_pf),
            ("employer_pf", self.employer_pf),
            ("tds", self.tds),
            ("esic", self.esic),
            ("professional_tax", self.professional_tax),
        ];
        match fields.iter().find(|(_, v)| v.is_sign_negative() && !v.is_zero()) {
            Some((field, value)) => Err(EngineError::invalid_input(
                *field,
                format!("must not be negative, got {}", value),
            )),
            None => Ok(()),
        }
    }
}

/// Totals derived from [`SalaryComponents`]. Never set directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryTotals {
    /// Sum of all earnings.
    pub gross_salary: Decimal,
    /// Sum of employee-side deductions.
    pub total_deductions: Decimal,
    /// Gross minus deductions.
    pub net_salary: Decimal,
    /// Gross plus employer contributions.
    pub ctc: Decimal,
}

impl SalaryTotals {
    fn derive(c: &SalaryComponents) -> Self {
        let gross_salary: Decimal = EarningComponent::ALL.iter().map(|e| c.earning(*e)).sum();
        let total_deductions = c.employee_pf + c.esic + c.professional_tax + c.tds;
        Self {
            gross_salary,
            total_deductions,
            net_salary: gross_salary - total_deductions,
            ctc: gross_salary + c.employer_pf,
        }
    }
}

/// One version of a user's salary.
///
/// Serialize-only: totals are always rebuilt from components through
/// [`SalaryStructure::new`], never read back from a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalaryStructure {
    /// Version id.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Settable amounts.
    components: SalaryComponents,
    /// Derived totals.
    totals: SalaryTotals,
    /// First day this version applies.
    pub effective_from: NaiveDate,
    /// Last day this version applies; `None` while open.
    pub effective_to: Option<NaiveDate>,
    /// Whether this is the current version.
    pub is_active: bool,
    /// What kind of change produced this version.
    pub increment_type: IncrementType,
    /// The version this one replaced.
    pub previous_structure_id: Option<String>,
}

impl SalaryStructure {
    /// Creates an open, active structure with totals derived from `components`.
    pub fn new(
        user_id: impl Into<String>,
        components: SalaryComponents,
        effective_from: NaiveDate,
        increment_type: IncrementType,
    ) -> EngineResult<Self> {
        components.validate()?;
        let totals = SalaryTotals::derive(&components);
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            components,
            totals,
            effective_from,
            effective_to: None,
            is_active: true,
            increment_type,
            previous_structure_id: None,
        })
    }

    /// The amounts this version was built from.
    pub fn components(&self) -> &SalaryComponents {
        &self.components
    }

    /// Derived totals.
    pub fn totals(&self) -> &SalaryTotals {
        &self.totals
    }

    /// True when `[effective_from, effective_to]` contains `date`.
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && self.effective_to.is_none_or(|to| to >= date)
    }

    /// True for the single active, open-ended version.
    pub fn is_current(&self) -> bool {
        self.is_active && self.effective_to.is_none()
    }
}

/// Append-only audit record of a salary revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryChangeLog {
    /// Log id.
    pub id: String,
    /// The version the change produced.
    pub salary_structure_id: String,
    /// Owner.
    pub user_id: String,
    /// Snapshot before the change (`None` for the first version).
    pub previous_values: Option<serde_json::Value>,
    /// Snapshot after the change.
    pub new_values: serde_json::Value,
    /// Who made the change.
    pub changed_by: String,
    /// When.
    pub changed_at: DateTime<Utc>,
}

/// Result of appending a revision to a [`SalaryHistory`].
#[derive(Debug, Clone)]
pub struct SalaryRevision {
    /// The predecessor after being closed, if there was one.
    pub closed: Option<SalaryStructure>,
    /// The new current version.
    pub created: SalaryStructure,
    /// Audit record of the change.
    pub change_log: SalaryChangeLog,
}

/// All salary versions of one user, ordered by `effective_from`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalaryHistory {
    versions: Vec<SalaryStructure>,
}

impl SalaryHistory {
    /// Builds a history from stored versions in any order.
    pub fn from_versions(mut versions: Vec<SalaryStructure>) -> Self {
        versions.sort_by(|a, b| a.effective_from.cmp(&b.effective_from));
        Self { versions }
    }

    /// Versions oldest first.
    pub fn versions(&self) -> &[SalaryStructure] {
        &self.versions
    }

    /// The open-ended active version, if any.
    pub fn current(&self) -> Option<&SalaryStructure> {
        self.versions.iter().rfind(|s| s.is_current())
    }

    /// The structure effective on `as_of`: `effective_from ≤ as_of` and no end
    /// date or `effective_to ≥ as_of`. The latest start wins on overlap.
    pub fn resolve(&self, as_of: NaiveDate) -> Option<&SalaryStructure> {
        self.versions.iter().rfind(|s| s.is_effective_on(as_of))
    }

    /// Appends a new version, closing the current one the day before
    /// `effective_from`.
    pub fn revise(
        &mut self,
        user_id: &str,
        components: SalaryComponents,
        effective_from: NaiveDate,
        increment_type: IncrementType,
        changed_by: &str,
    ) -> EngineResult<SalaryRevision> {
        let mut created = SalaryStructure::new(user_id, components, effective_from, increment_type)?;

        let closed = match self.versions.iter_mut().rfind(|s| s.is_current()) {
            Some(current) => {
                if effective_from <= current.effective_from {
                    return Err(EngineError::invalid_input(
                        "effective_from",
                        format!(
                            "revision must start after {} (current version start)",
                            current.effective_from
                        ),
                    ));
                }
                current.effective_to = Some(effective_from - Duration::days(1));
                current.is_active = false;
                created.previous_structure_id = Some(current.id.clone());
                Some(current.clone())
            }
            None => None,
        };

        let change_log = SalaryChangeLog {
            id: Uuid::new_v4().to_string(),
            salary_structure_id: created.id.clone(),
            user_id: user_id.to_string(),
            previous_values: closed.as_ref().map(snapshot),
            new_values: snapshot(&created),
            changed_by: changed_by.to_string(),
            changed_at: Utc::now(),
        };

        self.versions.push(created.clone());
        Ok(SalaryRevision {
            closed,
            created,
            change_log,
        })
    }
}

fn snapshot(structure: &SalaryStructure) -> serde_json::Value {
    serde_json::to_value(structure).unwrap_or(serde_json::Value::Null)
}
