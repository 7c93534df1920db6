//! Loan Models
//! Mission: Loan records, workflow statuses, and transition contracts

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Loan application record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub purpose: String,
    pub term: i64, // months
    pub full_name: String,
    pub employment_status: String,
    pub employment_address: String,
    pub status: LoanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Workflow states. Initial state is pending; approved and rejected are
/// terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoanStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "verified")]
    Verified,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "approved")]
    Approved,
}

impl LoanStatus {
    pub fn as_str(&self) -> &str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Verified => "verified",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Approved => "approved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LoanStatus::Pending),
            "verified" => Some(LoanStatus::Verified),
            "rejected" => Some(LoanStatus::Rejected),
            "approved" => Some(LoanStatus::Approved),
            _ => None,
        }
    }
}

/// Workflow transitions: pending -> verified -> approved, with rejection
/// reachable from pending or verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Verify,
    Reject,
    Approve,
}

impl Transition {
    /// Statuses the transition may be applied from
    pub fn allowed_from(&self) -> &'static [LoanStatus] {
        match self {
            Transition::Verify => &[LoanStatus::Pending],
            Transition::Reject => &[LoanStatus::Pending, LoanStatus::Verified],
            Transition::Approve => &[LoanStatus::Verified],
        }
    }

    /// Status the transition moves the loan into
    pub fn target(&self) -> LoanStatus {
        match self {
            Transition::Verify => LoanStatus::Verified,
            Transition::Reject => LoanStatus::Rejected,
            Transition::Approve => LoanStatus::Approved,
        }
    }

    /// Error message when the precondition fails, naming the current status
    pub fn rejection_message(&self, current: LoanStatus) -> String {
        match self {
            Transition::Verify => format!("Loan is already {}", current.as_str()),
            Transition::Reject => "Loan is already rejected".to_string(),
            Transition::Approve => "Loan must be verified before approval".to_string(),
        }
    }

    /// Audit columns stamped on success: (actor column, timestamp column)
    pub(crate) fn audit_columns(&self) -> (&'static str, &'static str) {
        match self {
            Transition::Verify => ("verified_by", "verification_date"),
            Transition::Reject => ("rejected_by", "rejection_date"),
            Transition::Approve => ("approved_by", "approval_date"),
        }
    }
}

/// Loan application request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyLoanRequest {
    pub amount: f64,
    pub purpose: String,
    pub term: i64,
    pub full_name: String,
    pub employment_status: String,
    pub employment_address: String,
}

/// Verify/reject/approve request body
#[derive(Debug, Default, Deserialize)]
pub struct TransitionRequest {
    pub notes: Option<String>,
}
