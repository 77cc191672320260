//! Configuration validation.

use dealdesk_core::{DealdeskError, DealdeskResult};

use crate::schema::ServerConfig;

/// Minimum secret length accepted for token verification.
const MIN_SECRET_LEN: usize = 16;

/// Validate a server configuration.
pub fn validate_config(config: &ServerConfig) -> DealdeskResult<()> {
    validate_database(config)?;
    validate_auth(config)?;
    validate_limits(config)?;
    Ok(())
}

fn validate_database(config: &ServerConfig) -> DealdeskResult<()> {
    if !config.database_url.starts_with("postgres://")
        && !config.database_url.starts_with("postgresql://")
    {
        return Err(DealdeskError::invalid_field(
            "DATABASE_URL",
            "Expected a postgres:// connection string",
        ));
    }
    Ok(())
}

fn validate_auth(config: &ServerConfig) -> DealdeskResult<()> {
    if config.jwt_secret.len() < MIN_SECRET_LEN {
        return Err(DealdeskError::invalid_field(
            "JWT_SECRET",
            format!("Secret must be at least {MIN_SECRET_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_limits(config: &ServerConfig) -> DealdeskResult<()> {
    if config.body_limit_bytes == 0 {
        return Err(DealdeskError::invalid_field(
            "BODY_LIMIT_BYTES",
            "Body limit must be greater than 0",
        ));
    }
    if config.request_timeout_secs == 0 {
        return Err(DealdeskError::invalid_field(
            "REQUEST_TIMEOUT_SECS",
            "Request timeout must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchedulerConfig;

    fn valid_config() -> ServerConfig {
        ServerConfig {
            database_url: "postgres://localhost/dealdesk".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            cors_origins: vec![],
            body_limit_bytes: 1024 * 1024,
            request_timeout_secs: 30,
            jwt_secret: "0123456789abcdef0123".into(),
            log_level: "info".into(),
            currency: "EGP".into(),
            scheduler: SchedulerConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_non_postgres_url_rejected() {
        let mut config = valid_config();
        config.database_url = "mysql://localhost/x".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = valid_config();
        config.jwt_secret = "short".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = valid_config();
        config.request_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}
