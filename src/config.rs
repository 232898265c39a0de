use std::env;

use anyhow::{ensure, Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;

pub const DEFAULT_ADMIN_PATH: &str = "/admin-console";
pub const DEFAULT_ADMIN_PAGE_SIZE: u32 = 50;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiry_minutes: i64,
    pub cors_allowed_origin: Option<String>,
    pub admin_path: String,
    pub admin_page_size: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "waitlist".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "waitlist-admin".to_string());
        let jwt_expiry_minutes = env::var("JWT_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("JWT_EXPIRY_MINUTES must be an integer")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let admin_path = normalize_admin_path(
            &env::var("ADMIN_PATH").unwrap_or_else(|_| DEFAULT_ADMIN_PATH.to_string()),
        )?;
        let admin_page_size = env::var("ADMIN_PAGE_SIZE")
            .unwrap_or_else(|_| DEFAULT_ADMIN_PAGE_SIZE.to_string())
            .parse()
            .context("ADMIN_PAGE_SIZE must be a positive integer")?;
        ensure!(admin_page_size > 0, "ADMIN_PAGE_SIZE must be a positive integer");

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            jwt_expiry_minutes,
            cors_allowed_origin,
            admin_path,
            admin_page_size,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() && parsed.set_password(Some("*****")).is_err() {
                return "***".to_string();
            }
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

/// Leading slash, no trailing slash, and never the API root.
fn normalize_admin_path(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_matches('/');
    ensure!(!trimmed.is_empty(), "ADMIN_PATH must not be empty");
    ensure!(
        trimmed != "api" && !trimmed.starts_with("api/"),
        "ADMIN_PATH must not live under /api"
    );
    Ok(format!("/{trimmed}"))
}
