use chrono::Duration;

use crate::conversation::ReplyPolicy;

/// Runtime settings the handlers need. Built by the server binary from the
/// environment, or directly by tests.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub admin_username: String,
    /// Argon2 PHC string for the admin password.
    pub admin_password_hash: String,
    /// Mark the session cookie `Secure` (production behind TLS).
    pub secure_cookies: bool,
    pub session_ttl: Duration,
    pub reply_policy: ReplyPolicy,
}

impl ApiConfig {
    pub const DEFAULT_SESSION_TTL_HOURS: i64 = 7 * 24;

    pub fn new(admin_username: impl Into<String>, admin_password_hash: impl Into<String>) -> Self {
        Self {
            admin_username: admin_username.into(),
            admin_password_hash: admin_password_hash.into(),
            secure_cookies: false,
            session_ttl: Duration::hours(Self::DEFAULT_SESSION_TTL_HOURS),
            reply_policy: ReplyPolicy::default(),
        }
    }
}
