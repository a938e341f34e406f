//! Command registration and matching.
//!
//! - [`Command`]: names, optional argument pattern, permission predicate, help, handler
//! - [`Registry`]: the matcher that resolves a line to commands and runs them
//! - [`Caller`]: per-invocation context handed to handlers
//! - [`permissions`]: predicate combinators
//! - [`builtin`]: the chat room command set used by the server binary

pub mod builtin;
mod caller;
mod command;
pub mod permissions;
mod registry;

pub use caller::Caller;
pub(crate) use caller::Request;
pub use command::{Command, DEFAULT_DESCRIPTION, DEFAULT_HELP, Handler};
pub use permissions::Predicate;
pub use registry::{
    DEFAULT_ERROR_MESSAGE, DEFAULT_HUH_MESSAGE, Gate, Hook, LifecycleHook, Registry, Resolution,
};
