//! Router Assembly
//! Mission: Wire public, auth, and protected routes with shared state

use crate::auth::{api as auth_api, auth_middleware, JwtHandler, UserStore};
use crate::loans::{api as loan_api, LoanStore};
use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub user_store: Arc<UserStore>,
    pub loan_store: Arc<LoanStore>,
    pub jwt_handler: Arc<JwtHandler>,
}

impl AppState {
    pub fn new(
        user_store: Arc<UserStore>,
        loan_store: Arc<LoanStore>,
        jwt_handler: Arc<JwtHandler>,
    ) -> Self {
        Self {
            user_store,
            loan_store,
            jwt_handler,
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let jwt_handler = state.jwt_handler.clone();

    // Public routes (no token required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(auth_api::register))
        .route("/api/auth/login", post(auth_api::login))
        .with_state(state.clone());

    // Protected routes behind the JWT middleware
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth_api::get_current_user))
        .route(
            "/api/loans",
            get(loan_api::get_loans).post(loan_api::apply_for_loan),
        )
        .route("/api/loans/:id", get(loan_api::get_loan))
        .route("/api/loans/:id/verify", put(loan_api::verify_loan))
        .route("/api/loans/:id/reject", put(loan_api::reject_loan))
        .route("/api/loans/:id/approve", put(loan_api::approve_loan))
        .route("/api/users", get(auth_api::list_users))
        .route("/api/users/admin", post(auth_api::create_admin))
        .route("/api/users/verifier", post(auth_api::create_verifier))
        .route(
            "/api/users/:id",
            get(auth_api::get_user).delete(auth_api::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            jwt_handler,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(route_not_found)
        .layer(middleware::from_fn(crate::middleware::request_logging))
        .layer(tower_http::cors::CorsLayer::permissive())
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
}
