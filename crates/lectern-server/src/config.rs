use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    /// Seeded at startup when both are set.
    pub admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("LECTERN_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("LECTERN_JWT_SECRET is unset or still a placeholder");
        }

        let host = var("LECTERN_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("LECTERN_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("LECTERN_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("LECTERN_HOST must be an IP address")?;

        let db_path: PathBuf = var("LECTERN_DB_PATH")
            .unwrap_or_else(|| "lectern.db".into())
            .into();

        let token_ttl_days = var("LECTERN_TOKEN_TTL_DAYS")
            .and_then(|v| v.parse().ok())
            .filter(|d: &i64| *d > 0)
            .unwrap_or(7);

        let admin = match (var("LECTERN_ADMIN_EMAIL"), var("LECTERN_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        };

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            token_ttl_days,
            admin,
        })
    }
}
