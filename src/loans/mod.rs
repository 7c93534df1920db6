//! Loan Module
//! Mission: Loan records and the pending -> verified -> approved/rejected workflow

pub mod api;
pub mod models;
pub mod store;

pub use models::{Loan, LoanStatus, Transition};
pub use store::{LoanStore, TransitionOutcome};
