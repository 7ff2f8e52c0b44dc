use std::{env, path::PathBuf, time::Duration};

use anyhow::Context;

use crate::cart::SignInPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub cart_storage_dir: PathBuf,
    pub sign_in_policy: SignInPolicy,
    pub cart_session_idle: Duration,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "APP_PORT", 3000);
        let cart_storage_dir = lookup("CART_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".storefront/carts"));
        let sign_in_policy = match lookup("CART_SIGN_IN_POLICY") {
            Some(raw) => raw.parse()?,
            None => SignInPolicy::default(),
        };
        let cart_session_idle =
            Duration::from_secs(parse_or(&lookup, "CART_SESSION_IDLE_SECS", 3600));
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10);
        let db_acquire_timeout =
            Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5));

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            cart_storage_dir,
            sign_in_policy,
            cart_session_idle,
            db_max_connections,
            db_acquire_timeout,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}
