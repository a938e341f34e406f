//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::net::IpAddr;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("parser.separator must not be empty")]
    EmptySeparator,
    #[error("parser.abort_command must not be empty")]
    EmptyAbortCommand,
    #[error("parser.abort_command must not contain the separator, got '{0}'")]
    AbortCommandContainsSeparator(String),
    #[error("parser.substitutions key must be exactly one character, got '{0}'")]
    InvalidSubstitutionKey(String),
    #[error("parser.substitutions['{0}'] must name a command")]
    EmptySubstitutionTarget(String),
    #[error("limits.{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("security.banned_hosts entry is not an IP address: '{0}'")]
    InvalidBannedHost(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    // Parser
    let parser = &config.parser;
    if parser.separator.is_empty() {
        errors.push(ValidationError::EmptySeparator);
    }
    if parser.abort_command.trim().is_empty() {
        errors.push(ValidationError::EmptyAbortCommand);
    } else if !parser.separator.is_empty() && parser.abort_command.contains(&parser.separator) {
        errors.push(ValidationError::AbortCommandContainsSeparator(
            parser.abort_command.clone(),
        ));
    }
    for (key, name) in &parser.substitutions {
        if key.chars().count() != 1 {
            errors.push(ValidationError::InvalidSubstitutionKey(key.clone()));
        }
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptySubstitutionTarget(key.clone()));
        }
    }

    // Limits
    if config.limits.max_line_length == 0 {
        errors.push(ValidationError::ZeroLimit("max_line_length"));
    }
    if config.limits.sendq == 0 {
        errors.push(ValidationError::ZeroLimit("sendq"));
    }

    // Security
    for host in &config.security.banned_hosts {
        if host.trim().parse::<IpAddr>().is_err() {
            errors.push(ValidationError::InvalidBannedHost(host.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
