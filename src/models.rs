use anyhow::{bail, Result};

/// Application configuration.
///
/// Loaded once in main and passed explicitly to each component; nothing else
/// reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "./loanbase.db".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .unwrap_or(5000);

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => bail!("JWT_SECRET must be set"),
        };

        let jwt_expiration_hours = std::env::var("JWT_EXPIRE_HOURS")
            .unwrap_or_else(|_| "720".to_string())
            .parse()
            .unwrap_or(720);

        Ok(Self {
            database_path,
            port,
            jwt_secret,
            jwt_expiration_hours,
        })
    }
}
