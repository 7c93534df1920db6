//! Authentication API Endpoints
//! Mission: Registration, login, current-user, and user management

use crate::api::{deserialize_body, success, success_with_count, ApiError, AppState};
use crate::auth::{
    middleware::extract_claims,
    models::{
        AuthResponse, CreateUserRequest, LoginRequest, RegisterRequest, Role, User, UserResponse,
    },
    rbac::{self, Permission},
};
use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_NAME_LEN: usize = 50;

fn validate_name(name: &str, errors: &mut Vec<String>) {
    let name = name.trim();
    if name.is_empty() {
        errors.push("Name is required".to_string());
    } else if name.len() > MAX_NAME_LEN {
        errors.push("Name cannot be more than 50 characters".to_string());
    }
}

fn validate_email(email: &str, errors: &mut Vec<String>) {
    let email = email.trim();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    });
    if !valid {
        errors.push("Please include a valid email".to_string());
    }
}

fn validate_password(password: &str, errors: &mut Vec<String>) {
    if password.len() < MIN_PASSWORD_LEN {
        errors.push("Password must be at least 6 characters".to_string());
    }
}

fn auth_response(user: &User, token: String) -> AuthResponse {
    AuthResponse {
        id: user.id.to_string(),
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
        token,
    }
}

/// Register a new user - POST /api/auth/register
///
/// Role defaults to applicant when not supplied.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = Vec::new();
    validate_name(&payload.name, &mut errors);
    validate_email(&payload.email, &mut errors);
    validate_password(&payload.password, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let role = payload.role.unwrap_or(Role::Applicant);

    let user = state
        .user_store
        .create_user(&payload.name, &payload.email, &payload.password, role)?
        .ok_or(ApiError::DuplicateEmail)?;

    let token = state.jwt_handler.generate_token(&user)?;

    info!("Registered user: {} ({})", user.email, user.role.as_str());

    Ok((StatusCode::CREATED, success(auth_response(&user, token))))
}

/// Login - POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut errors = Vec::new();
    validate_email(&payload.email, &mut errors);
    if payload.password.is_empty() {
        errors.push("Password is required".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Unknown email and wrong password both fall through to the same error,
    // so account existence never leaks.
    let user = state
        .user_store
        .authenticate(&payload.email, &payload.password)?
        .ok_or_else(|| {
            warn!("Failed login attempt: {}", payload.email);
            ApiError::InvalidCredentials
        })?;

    let token = state.jwt_handler.generate_token(&user)?;

    info!("Login successful: {} ({})", user.email, user.role.as_str());

    Ok(success(auth_response(&user, token)))
}

/// Get current user - GET /api/auth/me
pub async fn get_current_user(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    let claims = extract_claims(&req).ok_or(ApiError::Unauthenticated("Not authorized"))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthenticated("Invalid token"))?;

    let user = state
        .user_store
        .get_user_by_id(&user_id)?
        .ok_or(ApiError::Unauthenticated("User not found"))?;

    Ok(success(UserResponse::from_user(&user)))
}

/// List all users - GET /api/users (Admin only)
pub async fn list_users(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    rbac::authorize(extract_claims(&req), Permission::ManageUsers)?;

    let users = state.user_store.list_users()?;
    let response: Vec<UserResponse> = users.iter().map(UserResponse::from_user).collect();

    Ok(success_with_count(&response))
}

/// Get single user - GET /api/users/:id (Admin only)
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    rbac::authorize(extract_claims(&req), Permission::ManageUsers)?;

    let user_id = Uuid::parse_str(&user_id)
        .map_err(|_| ApiError::Validation(vec!["Invalid user id".to_string()]))?;

    let user = state
        .user_store
        .get_user_by_id(&user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(success(UserResponse::from_user(&user)))
}

/// Delete user - DELETE /api/users/:id (Admin only, never yourself)
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    let claims = rbac::authorize(extract_claims(&req), Permission::ManageUsers)?;

    let target_id = Uuid::parse_str(&user_id)
        .map_err(|_| ApiError::Validation(vec!["Invalid user id".to_string()]))?;

    let target = state
        .user_store
        .get_user_by_id(&target_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if target.id.to_string() == claims.sub {
        return Err(ApiError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    state.user_store.delete_user(&target.id)?;

    Ok(success(json!({})))
}

/// Create an admin - POST /api/users/admin (Admin only)
pub async fn create_admin(
    State(state): State<AppState>,
    req: Request,
) -> Result<impl IntoResponse, ApiError> {
    create_with_role(state, req, Role::Admin).await
}

/// Create a verifier - POST /api/users/verifier (Admin only)
pub async fn create_verifier(
    State(state): State<AppState>,
    req: Request,
) -> Result<impl IntoResponse, ApiError> {
    create_with_role(state, req, Role::Verifier).await
}

async fn create_with_role(
    state: AppState,
    req: Request,
    role: Role,
) -> Result<impl IntoResponse, ApiError> {
    rbac::authorize(extract_claims(&req), Permission::ManageUsers)?;

    let payload = deserialize_body::<CreateUserRequest>(req).await?;

    let mut errors = Vec::new();
    validate_name(&payload.name, &mut errors);
    validate_email(&payload.email, &mut errors);
    validate_password(&payload.password, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = state
        .user_store
        .create_user(&payload.name, &payload.email, &payload.password, role)?
        .ok_or(ApiError::DuplicateEmail)?;

    info!("User created: {} ({})", user.email, user.role.as_str());

    Ok((StatusCode::CREATED, success(UserResponse::from_user(&user))))
}
