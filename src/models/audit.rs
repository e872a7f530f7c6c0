//! Audit structures shared by every calculator.
//!
//! Calculators record each rule application as an [`AuditStep`] and attach
//! non-fatal findings as [`AuditWarning`]s. Mutations of persisted entities
//! are recorded separately as [`ChangeLogEntry`] snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The configuration entry or statute the rule comes from.
    pub reference: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// How serious a computation warning is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    /// Informational.
    Low,
    /// Should be reviewed before approval.
    Medium,
    /// Very likely wrong input data.
    High,
}

/// A warning generated during calculation.
///
/// Warnings indicate potential issues that don't prevent calculation
/// but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level.
    pub severity: WarningSeverity,
}

impl AuditWarning {
    /// Creates a warning.
    pub fn new(code: &str, message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity,
        }
    }
}

/// The complete audit trace for a calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
}

impl AuditTrace {
    /// Appends a step.
    pub fn push(&mut self, step: AuditStep) {
        self.steps.push(step);
    }

    /// Appends a warning.
    pub fn warn(&mut self, warning: AuditWarning) {
        self.warnings.push(warning);
    }

    /// Number to give the next step.
    pub fn next_step(&self) -> u32 {
        self.steps.len() as u32 + 1
    }

    /// True if a warning with `code` was recorded.
    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}

/// What happened to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeAction {
    /// First creation.
    Create,
    /// First computation of a payroll record.
    Generate,
    /// Recalculation overwriting a previous result.
    Regenerate,
    /// Field update.
    Update,
    /// Approval.
    Approve,
    /// Payment.
    Pay,
    /// Cancellation.
    Cancel,
}

/// Immutable before/after snapshot of an entity mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Entity type, e.g. `Payroll`.
    pub entity_name: String,
    /// Entity id.
    pub entity_id: String,
    /// What happened.
    pub action: ChangeAction,
    /// State before (`None` on create).
    pub previous_values: Option<serde_json::Value>,
    /// State after.
    pub new_values: serde_json::Value,
    /// Actor.
    pub changed_by: String,
    /// When.
    pub changed_at: DateTime<Utc>,
}

impl ChangeLogEntry {
    /// Builds an entry from serializable before/after states.
    pub fn capture<T: Serialize>(
        entity_name: &str,
        entity_id: &str,
        action: ChangeAction,
        previous: Option<&T>,
        new: &T,
        changed_by: &str,
    ) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            entity_id: entity_id.to_string(),
            action,
            previous_values: previous.and_then(|p| serde_json::to_value(p).ok()),
            new_values: serde_json::to_value(new).unwrap_or(serde_json::Value::Null),
            changed_by: changed_by.to_string(),
            changed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_step_numbering() {
        let mut trace = AuditTrace::default();
        assert_eq!(trace.next_step(), 1);
        trace.push(AuditStep {
            step_number: 1,
            rule_id: "salary_structure_lookup".to_string(),
            rule_name: "Salary Structure Lookup".to_string(),
            reference: "salary_structure".to_string(),
            input: serde_json::json!({}),
            output: serde_json::json!({}),
            reasoning: String::new(),
        });
        assert_eq!(trace.next_step(), 2);
    }

    #[test]
    fn test_warning_lookup() {
        let mut trace = AuditTrace::default();
        trace.warn(AuditWarning::new(
            "ZERO_WORKING_DAYS",
            "no working days",
            WarningSeverity::High,
        ));
        assert!(trace.has_warning("ZERO_WORKING_DAYS"));
        assert!(!trace.has_warning("NEGATIVE_NET_PAY"));
    }

    #[test]
    fn test_change_log_capture() {
        let entry = ChangeLogEntry::capture(
            "Payroll",
            "p1",
            ChangeAction::Approve,
            Some(&serde_json::json!({"status": "GENERATED"})),
            &serde_json::json!({"status": "APPROVED"}),
            "manager",
        );
        assert_eq!(entry.previous_values.unwrap()["status"], "GENERATED");
        assert_eq!(entry.new_values["status"], "APPROVED");
        let json = serde_json::to_string(&entry.action).unwrap();
        assert_eq!(json, "\"APPROVE\"");
    }
}
