use std::{env, fmt::Display, ops::RangeInclusive, path::PathBuf, str::FromStr};

use anyhow::{Result, bail};
use chrono::Duration;
use tracing::{info, warn};

use folio_api::{ApiConfig, ReplyPolicy};
use folio_crypto::password::{hash_password, validate_hash};

/// Admin passwords that MUST NOT be used.
const PLACEHOLDER_PASSWORDS: &[&str] = &["change-me", "changeme", "admin", "password"];

const SESSION_TTL_HOURS: RangeInclusive<i64> = 1..=24 * 365;
const REPLY_COOLDOWN_SECS: RangeInclusive<i64> = 0..=24 * 60 * 60;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub production: bool,
    /// SQLite file. `None` runs on an in-memory database with memory sessions.
    pub db_path: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub api: ApiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let production = env::var("FOLIO_ENV").is_ok_and(|v| v == "production");

        let admin_username = non_empty("FOLIO_ADMIN_USERNAME").unwrap_or_else(|| "admin".into());
        let admin_password_hash = admin_password_hash()?;

        let defaults = ReplyPolicy::default();
        let session_ttl = duration_in_range(
            "FOLIO_SESSION_TTL_HOURS",
            try_load("FOLIO_SESSION_TTL_HOURS", ApiConfig::DEFAULT_SESSION_TTL_HOURS),
            SESSION_TTL_HOURS,
            Duration::try_hours,
            Duration::hours(ApiConfig::DEFAULT_SESSION_TTL_HOURS),
        );
        let reply_policy = ReplyPolicy {
            max_visitor_replies: try_load("FOLIO_MAX_VISITOR_REPLIES", defaults.max_visitor_replies),
            cooldown: duration_in_range(
                "FOLIO_VISITOR_REPLY_COOLDOWN_SECS",
                try_load("FOLIO_VISITOR_REPLY_COOLDOWN_SECS", defaults.cooldown.num_seconds()),
                REPLY_COOLDOWN_SECS,
                Duration::try_seconds,
                defaults.cooldown,
            ),
        };

        let mut api = ApiConfig::new(admin_username, admin_password_hash);
        api.secure_cookies = production;
        api.session_ttl = session_ttl;
        api.reply_policy = reply_policy;

        Ok(Self {
            host: non_empty("FOLIO_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: try_load("FOLIO_PORT", 5000),
            production,
            db_path: non_empty("FOLIO_DB_PATH").map(PathBuf::from),
            static_dir: non_empty("FOLIO_STATIC_DIR").map(PathBuf::from),
            api,
        })
    }
}

/// A prehashed PHC string wins over a plaintext password.
fn admin_password_hash() -> Result<String> {
    if let Some(hash) = non_empty("FOLIO_ADMIN_PASSWORD_HASH") {
        validate_hash(&hash)?;
        return Ok(hash);
    }

    match non_empty("FOLIO_ADMIN_PASSWORD") {
        Some(password) if PLACEHOLDER_PASSWORDS.contains(&password.as_str()) => {
            bail!("FOLIO_ADMIN_PASSWORD is still a placeholder")
        }
        Some(password) => hash_password(&password),
        None => bail!("FOLIO_ADMIN_PASSWORD (or FOLIO_ADMIN_PASSWORD_HASH) is unset"),
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = non_empty(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
        default
    })
}

/// Out-of-range values warn and fall back, like unparseable ones.
fn duration_in_range(
    key: &str,
    value: i64,
    range: RangeInclusive<i64>,
    to_duration: fn(i64) -> Option<Duration>,
    default: Duration,
) -> Duration {
    match to_duration(value) {
        Some(duration) if range.contains(&value) => duration,
        _ => {
            warn!(
                "{key} must be between {} and {}, got {value}; using default",
                range.start(),
                range.end()
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_inside_the_range_are_kept() {
        let ttl = duration_in_range("TTL", 48, SESSION_TTL_HOURS, Duration::try_hours, Duration::hours(1));
        assert_eq!(ttl, Duration::hours(48));

        let cooldown = duration_in_range(
            "COOLDOWN",
            0,
            REPLY_COOLDOWN_SECS,
            Duration::try_seconds,
            Duration::seconds(60),
        );
        assert_eq!(cooldown, Duration::zero());
    }

    #[test]
    fn huge_or_negative_durations_fall_back() {
        let default = Duration::seconds(60);
        for value in [i64::MAX, i64::MIN, -1, 24 * 60 * 60 + 1] {
            let cooldown =
                duration_in_range("COOLDOWN", value, REPLY_COOLDOWN_SECS, Duration::try_seconds, default);
            assert_eq!(cooldown, default, "value {value}");
        }

        let ttl = duration_in_range("TTL", 0, SESSION_TTL_HOURS, Duration::try_hours, Duration::hours(168));
        assert_eq!(ttl, Duration::hours(168));
    }
}
