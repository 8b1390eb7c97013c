use anyhow::Context;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct ResetConfig {
    pub ttl_minutes: i64,
    pub link_base: String,
}

/// Account ensured at startup with the `admin` role.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub reset: ResetConfig,
    pub admin: Option<AdminConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: var_any(&["JWT_SECRET", "SECRET_KEY"])
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET (or SECRET_KEY) must be set"))?,
            algorithm: var_any(&["JWT_ALGORITHM", "ALGORITHM"]).unwrap_or_else(|| "HS256".into()),
            ttl_minutes: parsed_var("ACCESS_TOKEN_EXPIRE_MINUTES")?.unwrap_or(30),
        };
        let reset = ResetConfig {
            ttl_minutes: parsed_var("RESET_TOKEN_TTL_MINUTES")?.unwrap_or(60),
            link_base: std::env::var("RESET_LINK_BASE")
                .unwrap_or_else(|_| "http://localhost:8000/reset-password".into()),
        };
        ttl_from_minutes(jwt.ttl_minutes).context("ACCESS_TOKEN_EXPIRE_MINUTES")?;
        ttl_from_minutes(reset.ttl_minutes).context("RESET_TOKEN_TTL_MINUTES")?;

        let admin = match (
            std::env::var("ADMIN_EMAIL").ok(),
            std::env::var("ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(AdminConfig {
                email,
                password,
                full_name: std::env::var("ADMIN_FULL_NAME").unwrap_or_else(|_| "Admin User".into()),
            }),
            _ => None,
        };
        Ok(Self {
            database_url,
            jwt,
            reset,
            admin,
        })
    }
}

fn var_any(names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| std::env::var(n).ok())
}

fn parsed_var(name: &str) -> anyhow::Result<Option<i64>> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<i64>()
            .map(Some)
            .with_context(|| format!("{name} must be an integer, got {v:?}")),
        Err(_) => Ok(None),
    }
}

/// Converts a TTL in minutes to a `Duration`. Rejects non-positive values and
/// values whose expiry would fall outside the representable date range.
pub fn ttl_from_minutes(minutes: i64) -> anyhow::Result<Duration> {
    if minutes <= 0 {
        anyhow::bail!("TTL must be a positive number of minutes, got {minutes}");
    }
    let ttl = minutes
        .checked_mul(60)
        .map(Duration::seconds)
        .ok_or_else(|| anyhow::anyhow!("TTL of {minutes} minutes is out of range"))?;
    OffsetDateTime::now_utc()
        .checked_add(ttl)
        .ok_or_else(|| anyhow::anyhow!("TTL of {minutes} minutes is out of range"))?;
    Ok(ttl)
}
