use crate::error::{AppError, AppResult};
use std::env;
use std::time::Duration;

pub const DEFAULT_RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_webhook_secret: String,
    pub razorpay_api_base: String,
    pub gateway_timeout: Duration,
    pub sentry_dsn: Option<String>,
}

impl AppConfig {
    /// Load configuration from the environment, reading `.env` first if present
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let required = |name: &str| {
            env::var(name)
                .map_err(|_| AppError::Config(format!("{} environment variable must be set", name)))
        };

        let port = parse_var("PORT", env::var("PORT").ok(), 3000u16)?;
        let timeout_secs = parse_var(
            "GATEWAY_TIMEOUT_SECS",
            env::var("GATEWAY_TIMEOUT_SECS").ok(),
            10u64,
        )?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "billing.db".to_string()),
            port,
            jwt_secret: required("JWT_SECRET")?,
            razorpay_key_id: required("RAZORPAY_KEY_ID")?,
            razorpay_key_secret: required("RAZORPAY_KEY_SECRET")?,
            razorpay_webhook_secret: required("RAZORPAY_WEBHOOK_SECRET")?,
            razorpay_api_base: env::var("RAZORPAY_API_BASE")
                .unwrap_or_else(|_| DEFAULT_RAZORPAY_API_BASE.to_string()),
            gateway_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty()),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
    }
}
