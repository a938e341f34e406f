//! Unified error handling for gsb-ng.
//!
//! Handler failures are contained per line: the dispatcher captures them on
//! the [`Caller`](crate::commands::Caller), routes them to the registry's
//! `on_error` hook and carries on with the next line.

use std::panic::{AssertUnwindSafe, catch_unwind};
use thiserror::Error;

// ============================================================================
// Handler Errors (command and prompt callbacks)
// ============================================================================

/// Errors a command handler or interceptor callback can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not permitted")]
    NotPermitted,

    /// The handler panicked; the payload message is kept for the logs.
    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    /// Get a static error code string for log labelling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotPermitted => "not_permitted",
            Self::Panicked(_) => "panicked",
            Self::Internal(_) => "internal_error",
            Self::Other(_) => "other",
        }
    }

    /// Build a `Panicked` error from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

/// Run application code, turning a panic into [`HandlerError::Panicked`].
pub(crate) fn contain<T>(f: impl FnOnce() -> T) -> Result<T, HandlerError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(HandlerError::from_panic)
}

/// Control signal returned by a command handler that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// The handler acted; dispatch for this line ends.
    Handled,
    /// The handler declined; try the next command registered under the same name.
    ///
    /// Session requests the declining handler recorded (prompts, registry
    /// switches, disconnects) are discarded. Text it already sent stays sent.
    Continue,
}

/// Result type for command handlers.
pub type HandlerResult = Result<Flow, HandlerError>;

/// Result type for interceptor callbacks (reader completion, menu actions, ...).
pub type PromptResult = Result<(), HandlerError>;

/// What a single handler invocation produced, as seen by the matcher.
#[derive(Debug)]
pub enum Outcome {
    Handled,
    Continue,
    Failed(HandlerError),
}

impl From<HandlerResult> for Outcome {
    fn from(result: HandlerResult) -> Self {
        match result {
            Ok(Flow::Handled) => Self::Handled,
            Ok(Flow::Continue) => Self::Continue,
            Err(e) => Self::Failed(e),
        }
    }
}

// ============================================================================
// Registry Errors (command construction)
// ============================================================================

/// Errors raised while building or registering a command.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a command needs at least one name")]
    NoNames,

    #[error("invalid argument pattern for {name}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

// ============================================================================
// Transport Errors (line framing)
// ============================================================================

/// Errors raised while framing lines on a client socket.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("line too long: {actual} bytes (limit {limit})")]
    LineTooLong { actual: usize, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
