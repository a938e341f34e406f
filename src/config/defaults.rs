//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::collections::BTreeMap;

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_server_name() -> String {
    "gsb-ng".to_string()
}

// =============================================================================
// Listen Defaults
// =============================================================================

pub fn default_listen_address() -> std::net::SocketAddr {
    std::net::SocketAddr::from(([0, 0, 0, 0], 4000))
}

// =============================================================================
// Parser Defaults
// =============================================================================

pub fn default_separator() -> String {
    " ".to_string()
}

pub fn default_abort_command() -> String {
    crate::intercept::DEFAULT_ABORT_COMMAND.to_string()
}

pub fn default_huh_message() -> String {
    crate::commands::DEFAULT_HUH_MESSAGE.to_string()
}

pub fn default_error_message() -> String {
    crate::commands::DEFAULT_ERROR_MESSAGE.to_string()
}

/// `'hello` is shorthand for `say hello`.
pub fn default_substitutions() -> BTreeMap<String, String> {
    BTreeMap::from([("'".to_string(), "say".to_string())])
}

// =============================================================================
// Limits Defaults
// =============================================================================

pub fn default_max_line_length() -> usize {
    1024
}

pub fn default_sendq() -> usize {
    256
}
