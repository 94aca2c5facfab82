//! Service configuration.

use std::time::Duration;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// `SQLite` database URL (default: `sqlite://ebill.db`).
    pub database_url: String,

    /// Plaintext bootstrap password, salted and hashed before it is stored.
    pub root_password: Option<String>,

    /// SMTP relay host. Mail is disabled when unset.
    pub smtp_host: Option<String>,

    /// SMTP port (default: 587).
    pub smtp_port: u16,

    /// SMTP username (optional).
    pub smtp_username: Option<String>,

    /// SMTP password (optional).
    pub smtp_password: Option<String>,

    /// Sender mailbox for outbound mail.
    pub mail_from: String,

    /// Product name used to sign outbound mail.
    pub product_name: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// How long shutdown waits for outstanding mail sends, in seconds.
    pub notify_drain_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            root_password: std::env::var("ROOT_PASSWORD").ok(),
            smtp_host: std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty()),
            smtp_port: parse_env("SMTP_PORT").unwrap_or(defaults.smtp_port),
            smtp_username: std::env::var("SMTP_USERNAME").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            mail_from: std::env::var("MAIL_FROM").unwrap_or(defaults.mail_from),
            product_name: std::env::var("PRODUCT_NAME").unwrap_or(defaults.product_name),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: parse_env("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parse_env("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            notify_drain_seconds: parse_env("NOTIFY_DRAIN_SECONDS")
                .unwrap_or(defaults.notify_drain_seconds),
        }
    }

    /// Shutdown drain bound for notification tasks.
    #[must_use]
    pub fn notify_drain(&self) -> Duration {
        Duration::from_secs(self.notify_drain_seconds)
    }
}

/// Parse an environment variable, ignoring it when unset or malformed.
fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = %key, value = %raw, "Ignoring malformed setting");
            None
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: "sqlite://ebill.db".into(),
            root_password: None,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            mail_from: "noreply@localhost".into(),
            product_name: "EBill".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            notify_drain_seconds: 10,
        }
    }
}
