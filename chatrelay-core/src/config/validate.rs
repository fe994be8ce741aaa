//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.broker.host.trim().is_empty() {
        errors.push("broker.host must not be empty".to_string());
    }
    if config.client.poll_interval_ms == 0 {
        errors.push("client.poll_interval_ms must be > 0".to_string());
    }
    if config.client.input_poll_ms == 0 {
        errors.push("client.input_poll_ms must be > 0".to_string());
    }
    if config.client.queue_capacity == 0 {
        errors.push("client.queue_capacity must be > 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Config(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.client.queue_capacity = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("queue_capacity"));
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let mut config = Config::default();
        config.broker.host = "  ".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("broker.host"));
    }
}
