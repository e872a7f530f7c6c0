//! Compensation lifecycle engine.
//!
//! Computes monthly payroll from salary structures and attendance, accrues
//! and carries forward leave, and settles full-and-final dues on exit. All
//! business parameters come from effective-dated YAML configuration, and
//! every computed record carries an audit trace of the rules applied.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
