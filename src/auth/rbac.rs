//! Role-Based Access Control
//! Mission: Static permission table mapping operations to permitted roles

use crate::api::ApiError;
use crate::auth::models::{Claims, Role};

/// Operations guarded by a fixed role set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    CreateLoan,
    VerifyLoan,
    RejectLoan,
    ApproveLoan,
    ManageUsers,
}

impl Permission {
    /// Roles permitted for the operation. Static configuration, never
    /// computed at runtime.
    pub fn permitted_roles(&self) -> &'static [Role] {
        match self {
            Permission::CreateLoan => &[Role::Applicant],
            Permission::VerifyLoan => &[Role::Verifier],
            Permission::RejectLoan => &[Role::Verifier, Role::Admin],
            Permission::ApproveLoan => &[Role::Admin],
            Permission::ManageUsers => &[Role::Admin],
        }
    }
}

/// Gate a request's resolved claims against a permission.
///
/// Missing claims means the auth middleware never resolved an identity.
pub fn authorize(claims: Option<&Claims>, permission: Permission) -> Result<&Claims, ApiError> {
    let claims = claims.ok_or(ApiError::Unauthenticated("Not authorized"))?;

    if permission.permitted_roles().contains(&claims.role) {
        Ok(claims)
    } else {
        Err(ApiError::Forbidden(format!(
            "User role {} is not authorized to access this route",
            claims.role.as_str()
        )))
    }
}
