use std::time::Duration;

use anyhow::Context;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Auth service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
}

/// Report service configuration. Only the access secret is shared with it.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub database_url: String,
    pub auth_database_url: String,
    pub max_connections: u32,
    pub access_secret: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let access_secret = required_secret("JWT_SECRET")?;
        let refresh_secret = required_secret("JWT_REFRESH_SECRET")?;
        anyhow::ensure!(
            access_secret != refresh_secret,
            "JWT_SECRET and JWT_REFRESH_SECRET must differ"
        );

        let jwt = JwtConfig {
            access_secret,
            refresh_secret,
            access_ttl: duration_var("JWT_ACCESS_EXPIRY", "15m")?,
            refresh_ttl: duration_var("JWT_REFRESH_EXPIRY", "7d")?,
        };
        Ok(Self {
            database_url,
            max_connections: max_connections(),
            jwt,
        })
    }
}

impl ReportConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL")?,
            auth_database_url: std::env::var("AUTH_DATABASE_URL").context("AUTH_DATABASE_URL")?,
            max_connections: max_connections(),
            access_secret: required_secret("JWT_SECRET")?,
        })
    }
}

fn required_secret(key: &str) -> anyhow::Result<String> {
    let value = std::env::var(key).with_context(|| format!("{key} is not set"))?;
    anyhow::ensure!(!value.is_empty(), "{key} must not be empty");
    Ok(value)
}

fn duration_var(key: &str, default: &str) -> anyhow::Result<Duration> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.into());
    parse_ttl(&raw).with_context(|| format!("invalid {key}: {raw:?}"))
}

fn max_connections() -> u32 {
    std::env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(10)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,
    #[error("invalid number in duration")]
    InvalidNumber,
    #[error("unknown unit {0:?}")]
    UnknownUnit(String),
    #[error("duration overflows")]
    Overflow,
    #[error("expiry would fall outside the representable date range")]
    OutOfRange,
}

/// Parses expiry strings such as `15m` or `7d`.
///
/// A single integer followed by `s`, `m`, `h` or `d` is the common form. Anything
/// else goes through [`parse_compound`], which accepts sequences like `1h30m`
/// or `250ms`.
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let s = s.trim();
    if s.len() < 2 {
        return Err(DurationError::Empty);
    }
    let Some((idx, unit)) = s.char_indices().last() else {
        return Err(DurationError::Empty);
    };
    let value = &s[..idx];
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return parse_compound(s),
    };
    // "250ms" ends in "s" but is not a plain seconds value
    match value.parse::<u64>() {
        Ok(n) => n
            .checked_mul(multiplier)
            .map(Duration::from_secs)
            .ok_or(DurationError::Overflow),
        Err(_) => parse_compound(s),
    }
}

/// [`parse_duration`] for token lifetimes: `now + ttl` must still be a valid
/// timestamp, so an oversized value fails at startup rather than at signing.
pub fn parse_ttl(s: &str) -> Result<Duration, DurationError> {
    let ttl = parse_duration(s)?;
    let ttl = time::Duration::try_from(ttl).map_err(|_| DurationError::OutOfRange)?;
    time::OffsetDateTime::now_utc()
        .checked_add(ttl)
        .ok_or(DurationError::OutOfRange)?;
    Duration::try_from(ttl).map_err(|_| DurationError::OutOfRange)
}

fn parse_compound(s: &str) -> Result<Duration, DurationError> {
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(DurationError::InvalidNumber);
        }
        let (number, tail) = rest.split_at(digits);
        let number: f64 = number.parse().map_err(|_| DurationError::InvalidNumber)?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let unit_secs = match unit {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "d" => 86400.0,
            other => return Err(DurationError::UnknownUnit(other.to_string())),
        };
        let part = Duration::try_from_secs_f64(number * unit_secs)
            .map_err(|_| DurationError::Overflow)?;
        total = total.checked_add(part).ok_or(DurationError::Overflow)?;
        rest = tail;
    }
    Ok(total)
}
