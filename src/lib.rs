//! Loanbase Backend Library
//!
//! Exposes core modules for use by the binary and integration tests.

pub mod api;
pub mod auth;
pub mod loans;
pub mod middleware;
pub mod models;
