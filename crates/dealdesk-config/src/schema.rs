//! Configuration schema for the dealdesk server.

use serde::{Deserialize, Serialize};

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_currency() -> String {
    "EGP".to_string()
}

/// Root configuration for the server process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Postgres connection string
    pub database_url: String,
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty list means same-origin only
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum JSON body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Per-request deadline in seconds; the in-flight transaction is
    /// rolled back when it expires
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// HMAC secret for verifying bearer tokens
    pub jwt_secret: String,
    /// tracing filter directive, e.g. "info" or "dealdesk=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Currency label used in written amounts
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Background scheduler switches
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run the daily block-expiry job
    #[serde(default = "default_true")]
    pub block_expiry_enabled: bool,
    /// Run the hourly hold-reminder job
    #[serde(default = "default_true")]
    pub hold_reminder_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            block_expiry_enabled: true,
            hold_reminder_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables. `DATABASE_URL` and
    /// `JWT_SECRET` are required; everything else has defaults.
    pub fn from_env() -> dealdesk_core::DealdeskResult<Self> {
        let lookup = |key: &str| std::env::var(key).ok();
        Self::from_lookup(&lookup)
    }

    /// Environment loading against an injectable lookup, so tests do not
    /// mutate process state.
    pub fn from_lookup(
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> dealdesk_core::DealdeskResult<Self> {
        use dealdesk_core::DealdeskError;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| DealdeskError::config_missing("DATABASE_URL is not set"))?;
        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| DealdeskError::config_missing("JWT_SECRET is not set"))?;

        let parse_u16 = |key: &str, default: u16| -> dealdesk_core::DealdeskResult<u16> {
            match lookup(key) {
                Some(v) => v
                    .parse()
                    .map_err(|_| DealdeskError::invalid_field(key, "Expected an integer")),
                None => Ok(default),
            }
        };
        let parse_u64 = |key: &str, default: u64| -> dealdesk_core::DealdeskResult<u64> {
            match lookup(key) {
                Some(v) => v
                    .parse()
                    .map_err(|_| DealdeskError::invalid_field(key, "Expected an integer")),
                None => Ok(default),
            }
        };
        let parse_bool = |key: &str, default: bool| -> bool {
            lookup(key)
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(default)
        };

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(default_host),
            port: parse_u16("PORT", default_port())?,
            cors_origins,
            body_limit_bytes: parse_u64("BODY_LIMIT_BYTES", default_body_limit() as u64)? as usize,
            request_timeout_secs: parse_u64("REQUEST_TIMEOUT_SECS", default_request_timeout())?,
            jwt_secret,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(default_log_level),
            currency: lookup("CURRENCY").unwrap_or_else(default_currency),
            scheduler: SchedulerConfig {
                block_expiry_enabled: parse_bool("BLOCK_EXPIRY_ENABLED", true),
                hold_reminder_enabled: parse_bool("HOLD_REMINDER_ENABLED", true),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_minimal_env() {
        let vars = env(&[
            ("DATABASE_URL", "postgres://localhost/dealdesk"),
            ("JWT_SECRET", "secret"),
        ]);
        let lookup = |key: &str| vars.get(key).cloned();
        let config = ServerConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(config.scheduler.block_expiry_enabled);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_missing_database_url() {
        let vars = env(&[("JWT_SECRET", "secret")]);
        let lookup = |key: &str| vars.get(key).cloned();
        assert!(ServerConfig::from_lookup(&lookup).is_err());
    }

    #[test]
    fn test_cors_origin_list() {
        let vars = env(&[
            ("DATABASE_URL", "postgres://localhost/dealdesk"),
            ("JWT_SECRET", "secret"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
        ]);
        let lookup = |key: &str| vars.get(key).cloned();
        let config = ServerConfig::from_lookup(&lookup).unwrap();
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_bad_port_rejected() {
        let vars = env(&[
            ("DATABASE_URL", "postgres://localhost/dealdesk"),
            ("JWT_SECRET", "secret"),
            ("PORT", "eighty"),
        ]);
        let lookup = |key: &str| vars.get(key).cloned();
        assert!(ServerConfig::from_lookup(&lookup).is_err());
    }
}
