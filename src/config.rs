// Server configuration, environment-driven with defaults.

use std::env;
use std::path::PathBuf;

use crate::auth::DEFAULT_TOKEN_TTL_SECS;

pub const ENV_BIND_ADDR: &str = "LOYALTY_BIND_ADDR";
pub const ENV_DB_PATH: &str = "LOYALTY_DB_PATH";
pub const ENV_JWT_SECRET: &str = "LOYALTY_JWT_SECRET";
pub const ENV_TOKEN_TTL_SECS: &str = "LOYALTY_TOKEN_TTL_SECS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DB_PATH: &str = "loyalty.db";
const DEFAULT_JWT_SECRET: &str = "development-secret";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            bind_addr: env_str(ENV_BIND_ADDR, DEFAULT_BIND_ADDR),
            database_path: PathBuf::from(env_str(ENV_DB_PATH, DEFAULT_DB_PATH)),
            jwt_secret: env_str(ENV_JWT_SECRET, DEFAULT_JWT_SECRET),
            token_ttl_secs: env_u64(ENV_TOKEN_TTL_SECS, DEFAULT_TOKEN_TTL_SECS),
        }
    }

    /// True when the JWT secret was not overridden; main logs a warning.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn env_str(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}
