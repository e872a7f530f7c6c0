//! HTTP API for the Compensation Engine.
//!
//! Thin JSON endpoints over the payroll, leave, salary and settlement
//! services. Batch endpoints run on the shared worker pool.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::{CalculateFnfRequest, ReviseSalaryRequest, create_router};
pub use request::{
    ActorRequest, AdvanceRequest, BatchRequest, CarryForwardRequest, ClearanceRequest,
    GeneratePayrollRequest, JoiningCreditRequest, PeriodRequest,
};
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;
