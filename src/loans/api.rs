//! Loan API Endpoints
//! Mission: Loan application, role-filtered listing, and workflow transitions

use crate::api::{
    deserialize_body, deserialize_body_or_default, success, success_with_count, ApiError, AppState,
};
use crate::auth::{
    middleware::extract_claims,
    models::{Claims, Role},
    rbac::{self, Permission},
};
use crate::loans::models::{ApplyLoanRequest, LoanStatus, Transition, TransitionRequest};
use crate::loans::store::TransitionOutcome;
use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

const MIN_LOAN_AMOUNT: f64 = 100.0;
const MIN_LOAN_TERM: i64 = 1;

fn validate_application(request: &ApplyLoanRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if request.amount < MIN_LOAN_AMOUNT {
        errors.push("Loan amount must be at least 100".to_string());
    }
    if request.term < MIN_LOAN_TERM {
        errors.push("Loan term must be at least 1 month".to_string());
    }
    if request.purpose.trim().is_empty() {
        errors.push("Purpose is required".to_string());
    }
    if request.full_name.trim().is_empty() {
        errors.push("Full name is required".to_string());
    }
    if request.employment_status.trim().is_empty() {
        errors.push("Employment status is required".to_string());
    }
    if request.employment_address.trim().is_empty() {
        errors.push("Employment address is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn actor_id(claims: &Claims) -> Result<Uuid, ApiError> {
    Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthenticated("Invalid token"))
}

fn parse_loan_id(loan_id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(loan_id).map_err(|_| ApiError::NotFound("Loan not found".to_string()))
}

/// Apply for a loan - POST /api/loans (applicant only)
pub async fn apply_for_loan(
    State(state): State<AppState>,
    req: Request,
) -> Result<impl IntoResponse, ApiError> {
    let claims = rbac::authorize(extract_claims(&req), Permission::CreateLoan)?;
    let applicant = actor_id(claims)?;

    let payload = deserialize_body::<ApplyLoanRequest>(req).await?;
    validate_application(&payload)?;

    let loan = state.loan_store.create_loan(applicant, &payload)?;

    Ok((StatusCode::CREATED, success(loan)))
}

/// List loans - GET /api/loans, filtered by the caller's role:
/// applicants see their own, verifiers see pending, admins see all.
pub async fn get_loans(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    let claims = extract_claims(&req).ok_or(ApiError::Unauthenticated("Not authorized"))?;

    let loans = match claims.role {
        Role::Applicant => {
            let owner = actor_id(claims)?;
            state.loan_store.list_for_user(&owner)?
        }
        Role::Verifier => state.loan_store.list_by_status(LoanStatus::Pending)?,
        Role::Admin => state.loan_store.list_all()?,
    };

    Ok(success_with_count(&loans))
}

/// Get a single loan - GET /api/loans/:id (owner, verifier, or admin)
pub async fn get_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<String>,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    let claims = extract_claims(&req).ok_or(ApiError::Unauthenticated("Not authorized"))?;
    let loan_id = parse_loan_id(&loan_id)?;

    let loan = state
        .loan_store
        .get_loan(&loan_id)?
        .ok_or_else(|| ApiError::NotFound("Loan not found".to_string()))?;

    let is_owner = loan.user_id.to_string() == claims.sub;
    if claims.role == Role::Applicant && !is_owner {
        return Err(ApiError::Forbidden(
            "Not authorized to access this loan".to_string(),
        ));
    }

    Ok(success(loan))
}

/// Verify a loan - PUT /api/loans/:id/verify (verifier only)
pub async fn verify_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<String>,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    transition_loan(state, loan_id, req, Transition::Verify, Permission::VerifyLoan).await
}

/// Reject a loan - PUT /api/loans/:id/reject (verifier or admin)
pub async fn reject_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<String>,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    transition_loan(state, loan_id, req, Transition::Reject, Permission::RejectLoan).await
}

/// Approve a loan - PUT /api/loans/:id/approve (admin only)
pub async fn approve_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<String>,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    transition_loan(
        state,
        loan_id,
        req,
        Transition::Approve,
        Permission::ApproveLoan,
    )
    .await
}

async fn transition_loan(
    state: AppState,
    loan_id: String,
    req: Request,
    transition: Transition,
    permission: Permission,
) -> Result<Json<Value>, ApiError> {
    let claims = rbac::authorize(extract_claims(&req), permission)?;
    let actor = actor_id(claims)?;
    let loan_id = parse_loan_id(&loan_id)?;

    let payload = deserialize_body_or_default::<TransitionRequest>(req).await?;

    let outcome =
        state
            .loan_store
            .apply_transition(&loan_id, transition, &actor, payload.notes.as_deref())?;

    match outcome {
        TransitionOutcome::Applied(loan) => Ok(success(loan)),
        TransitionOutcome::NotFound => Err(ApiError::NotFound("Loan not found".to_string())),
        TransitionOutcome::InvalidState(current) => Err(ApiError::InvalidTransition(
            transition.rejection_message(current),
        )),
    }
}
