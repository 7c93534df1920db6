//! Loanbase - Loan Application Backend
//! Mission: Role-gated loan approval workflow over a REST/JSON API

use anyhow::{Context, Result};
use loanbase_backend::{
    api::{create_router, AppState},
    auth::{JwtHandler, UserStore},
    loans::LoanStore,
    models::Config,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    let user_store = Arc::new(
        UserStore::new(&config.database_path).context("Failed to initialize user store")?,
    );
    let loan_store = Arc::new(
        LoanStore::new(&config.database_path).context("Failed to initialize loan store")?,
    );
    let jwt_handler = Arc::new(JwtHandler::new(
        config.jwt_secret.clone(),
        config.jwt_expiration_hours,
    ));

    let app = create_router(AppState::new(user_store, loan_store, jwt_handler));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing with env-filter support
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loanbase_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
