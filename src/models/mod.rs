//! Core data models for the Compensation Engine.
//!
//! This module contains all the domain records used throughout the engine.

mod attendance;
mod audit;
mod employee;
mod fnf;
mod leave;
mod payroll;
mod period;
mod salary;

pub use attendance::AttendanceSummary;
pub use audit::{
    AuditStep, AuditTrace, AuditWarning, ChangeAction, ChangeLogEntry, WarningSeverity,
};
pub use employee::{Employee, ExitReason};
pub use fnf::{
    ClearanceKind, ClearanceStatus, Clearances, EncashmentLine, FinalMonthPay, FnfSettlement,
    FnfStatus, GratuityLine, NoticeRecovery, SalaryBreakdown, SettlementItem,
};
pub use leave::{
    CategoryCredit, CategoryError, CreditKey, CreditSource, LeaveBalance,
    LeaveCreditResult, LeaveLedgerEntry,
};
pub use payroll::{
    AttendanceCounts, Bonus, BonusDetail, BonusStatus, Deductions, PayrollRecord, PayrollStatus,
    ProratedEarnings,
};
pub use period::{FinancialYear, PayrollPeriod};
pub use salary::{
    EarningComponent, IncrementType, SalaryChangeLog, SalaryComponents, SalaryHistory,
    SalaryRevision, SalaryStructure, SalaryTotals,
};
