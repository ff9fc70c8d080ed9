use std::env;

use anyhow::{Context, Result, bail};
use chrono::Weekday;
use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    /// Days that never count towards a leave's length
    pub weekend_days: Vec<Weekday>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,

            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("RATE_PROTECTED_PER_MIN must be a number")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            weekend_days: parse_weekend(
                &env::var("WEEKEND_DAYS").unwrap_or_else(|_| "sat,sun".to_string()),
            )?,
        })
    }
}

/// Comma-separated day names, e.g. `fri,sat`. Empty means a seven-day week.
pub fn parse_weekend(value: &str) -> Result<Vec<Weekday>> {
    let mut days = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let day: Weekday = match name.parse() {
            Ok(day) => day,
            Err(_) => bail!("WEEKEND_DAYS: unknown day '{name}'"),
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}
