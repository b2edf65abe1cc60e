use std::env;
use std::time::Duration;

pub fn normalize_env_value(raw: String) -> String {
    let trimmed = raw.trim();

    if let Some(inner) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return inner.trim().to_string();
    }

    trimmed.to_string()
}

pub fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(normalize_env_value)
        .filter(|s| !s.is_empty())
}

fn env_i64(key: &str, default: i64) -> i64 {
    env_string(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_string(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_string(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Brevo credentials; `None` on [`AppConfig`] when the mailer is not
/// configured (role creation still succeeds, with `emailSent: false`).
#[derive(Clone, Debug)]
pub struct MailerConfig {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: String,
    /// Base for verification links: `{site_url}/auth/verify-role?token=...`.
    pub site_url: String,
    pub token_ttl_secs: i64,
    pub monitor_poll_interval: Duration,
    pub monitor_max_attempts: u32,
    pub monitor_store_timeout: Duration,
    pub mailer: Option<MailerConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mailer = match (env_string("BREVO_API_KEY"), env_string("BREVO_SENDER_EMAIL")) {
            (Some(api_key), Some(sender_email)) => Some(MailerConfig {
                api_key,
                sender_email,
                sender_name: env_string("BREVO_SENDER_NAME"),
                timeout: Duration::from_secs(env_u64("MAILER_TIMEOUT_SECS", 5)),
            }),
            _ => None,
        };

        AppConfig {
            database_url: env_string("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://portera.db?mode=rwc".to_string()),
            listen_addr: env_string("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            site_url: env_string("SITE_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
            token_ttl_secs: env_i64("TOKEN_TTL_SECS", 24 * 60 * 60),
            monitor_poll_interval: Duration::from_millis(env_u64("MONITOR_POLL_INTERVAL_MS", 2_000)),
            monitor_max_attempts: env_u32("MONITOR_MAX_ATTEMPTS", 10),
            monitor_store_timeout: Duration::from_millis(env_u64("MONITOR_STORE_TIMEOUT_MS", 3_000)),
            mailer,
        }
    }
}
