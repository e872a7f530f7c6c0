//! Monthly attendance summary supplied by the attendance aggregator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-employee, per-month attendance counts.
///
/// Produced by the external attendance module; the engine consumes it as-is
/// and derives working and payable days itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    /// Calendar days in the period.
    pub total_days: u32,
    /// Working days as reported by the aggregator (informational).
    #[serde(default)]
    pub working_days: u32,
    /// Full days present.
    pub present_days: u32,
    /// Days absent without leave.
    #[serde(default)]
    pub absent_days: u32,
    /// Days on paid leave.
    #[serde(default)]
    pub paid_leave_days: Decimal,
    /// Days on unpaid leave (loss of pay).
    #[serde(default)]
    pub unpaid_leave_days: Decimal,
    /// Public holidays in the period.
    #[serde(default)]
    pub holidays: u32,
    /// Public holidays on which the employee worked.
    #[serde(default)]
    pub holidays_worked: u32,
    /// Weekly offs in the period.
    #[serde(default)]
    pub weekoffs: u32,
    /// Days worked as half days.
    #[serde(default)]
    pub half_days: u32,
}

impl AttendanceSummary {
    /// `total_days − holidays − weekoffs`, floored at zero.
    pub fn derived_working_days(&self) -> u32 {
        self.total_days
            .saturating_sub(self.holidays)
            .saturating_sub(self.weekoffs)
    }

    /// Days attended, counting each half day as 0.5.
    pub fn attended_days(&self) -> Decimal {
        Decimal::from(self.present_days) + Decimal::from(self.half_days) / Decimal::TWO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_working_days() {
        let summary = AttendanceSummary {
            total_days: 30,
            holidays: 2,
            weekoffs: 4,
            ..Default::default()
        };
        assert_eq!(summary.derived_working_days(), 24);
    }

    #[test]
    fn test_derived_working_days_never_underflows() {
        let summary = AttendanceSummary {
            total_days: 3,
            holidays: 2,
            weekoffs: 4,
            ..Default::default()
        };
        assert_eq!(summary.derived_working_days(), 0);
    }

    #[test]
    fn test_half_days_count_as_half() {
        let summary = AttendanceSummary {
            present_days: 20,
            half_days: 3,
            ..Default::default()
        };
        assert_eq!(summary.attended_days(), Decimal::new(215, 1));
    }
}
