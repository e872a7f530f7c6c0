//! Payroll periods and financial years.
//!
//! This module contains the [`PayrollPeriod`] and [`FinancialYear`] types that
//! every calculator uses for calendar arithmetic.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, EngineResult};

/// A calendar month for which payroll is generated.
///
/// # Example
///
/// ```
/// use compensation_engine::models::PayrollPeriod;
/// use chrono::NaiveDate;
///
/// let period = PayrollPeriod::new(2, 2024).unwrap();
/// assert_eq!(period.total_days(), 29);
/// assert_eq!(period.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PayrollPeriod {
    /// The year.
    pub year: i32,
    /// The month (1-12).
    pub month: u32,
}

impl PayrollPeriod {
    /// Creates a period, rejecting months outside 1..=12.
    pub fn new(month: u32, year: i32) -> EngineResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::invalid_input(
                "month",
                format!("{} is not a calendar month", month),
            ));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(EngineError::invalid_input(
                "year",
                format!("{} is out of range", year),
            ));
        }
        Ok(Self { year, month })
    }

    /// Returns the period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The first day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The last day of the month.
    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day() - Duration::days(1)
    }

    /// Number of calendar days in the month.
    pub fn total_days(&self) -> u32 {
        self.last_day().day()
    }

    /// The following month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Checks whether `date` lies inside this month.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for PayrollPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A twelve-month financial year starting in a configurable month.
///
/// The default Indian financial year runs April to March, so the year that
/// starts in April 2025 is labelled `2025-2026`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FinancialYear {
    /// Calendar year in which the financial year starts.
    pub start_year: i32,
    /// Calendar month in which the financial year starts.
    pub start_month: u32,
}

impl FinancialYear {
    /// Returns the financial year (starting in `start_month`) that contains `date`.
    pub fn containing(date: NaiveDate, start_month: u32) -> Self {
        let start_year = if date.month() >= start_month {
            date.year()
        } else {
            date.year() - 1
        };
        Self {
            start_year,
            start_month,
        }
    }

    /// Human-readable label, e.g. `2025-2026`. Calendar-year FYs use a single year.
    pub fn label(&self) -> String {
        if self.start_month == 1 {
            format!("{}", self.start_year)
        } else {
            format!("{}-{}", self.start_year, self.start_year + 1)
        }
    }

    /// First day of the financial year.
    pub fn start_date(&self) -> NaiveDate {
        PayrollPeriod {
            year: self.start_year,
            month: self.start_month,
        }
        .first_day()
    }

    /// Last day of the financial year.
    pub fn end_date(&self) -> NaiveDate {
        self.next().start_date() - Duration::days(1)
    }

    /// The financial year after this one.
    pub fn next(&self) -> Self {
        Self {
            start_year: self.start_year + 1,
            start_month: self.start_month,
        }
    }

    /// 1-based position of a calendar month within this financial year.
    ///
    /// ```
    /// use compensation_engine::models::FinancialYear;
    ///
    /// let fy = FinancialYear { start_year: 2025, start_month: 4 };
    /// assert_eq!(fy.month_position(4), 1);
    /// assert_eq!(fy.month_position(3), 12);
    /// ```
    pub fn month_position(&self, month: u32) -> u32 {
        (month + 12 - self.start_month) % 12 + 1
    }

    /// Number of whole months in the financial year after the month of `date`.
    pub fn months_remaining_after(&self, date: NaiveDate) -> u32 {
        12 - self.month_position(date.month())
    }

    /// The period at 1-based `position` within the financial year.
    pub fn period_at(&self, position: u32) -> PayrollPeriod {
        let offset = self.start_month - 1 + (position.clamp(1, 12) - 1);
        PayrollPeriod {
            year: self.start_year + (offset / 12) as i32,
            month: offset % 12 + 1,
        }
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
