//! Application state for the Compensation Engine API.

use crate::services::{EngineContext, FnfService, LeaveService, PayrollService, SalaryService};

/// Shared application state.
///
/// Holds one instance of every service; each is a cheap handle over the
/// shared [`EngineContext`].
#[derive(Clone)]
pub struct AppState {
    payroll: PayrollService,
    leave: LeaveService,
    fnf: FnfService,
    salary: SalaryService,
}

impl AppState {
    /// Creates the state from the engine's collaborators.
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            payroll: PayrollService::new(ctx.clone()),
            leave: LeaveService::new(ctx.clone()),
            fnf: FnfService::new(ctx.clone()),
            salary: SalaryService::new(ctx),
        }
    }

    /// Payroll operations.
    pub fn payroll(&self) -> &PayrollService {
        &self.payroll
    }

    /// Leave operations.
    pub fn leave(&self) -> &LeaveService {
        &self.leave
    }

    /// Settlement operations.
    pub fn fnf(&self) -> &FnfService {
        &self.fnf
    }

    /// Salary operations.
    pub fn salary(&self) -> &SalaryService {
        &self.salary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}
