//! Configuration validation.
//!
//! Validates numeric ranges and required strings, collecting every problem
//! into a single error.

use crate::schema::GatewayConfig;
use gateway_common::ConfigError;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &GatewayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    // Serial
    if config.serial.device.trim().is_empty() {
        errors.push("serial.device must not be empty".into());
    }
    validate_range(&mut errors, "serial.baud_rate", config.serial.baud_rate as u64, 1, u32::MAX as u64);
    validate_range(
        &mut errors,
        "serial.read_buffer_size",
        config.serial.read_buffer_size as u64,
        64,
        65_536,
    );

    // Server
    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }
    validate_range(&mut errors, "server.handshake_timeout", config.server.handshake_timeout, 1, 300);

    // Session
    validate_range(&mut errors, "session.retry_delay_ms", config.session.retry_delay_ms, 10, 60_000);

    // Logging
    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(format!(
            "logging.level = {:?} must be one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

/// Push an error if `value` is outside `[min, max]`.
fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}
