//! gsb-ng - Game Server Base (Next Generation)
//!
//! A session-level command dispatcher for line-oriented telnet and MUD
//! servers. Each connection owns a [`Session`]; every inbound line is either
//! matched against the session's [`Registry`](commands::Registry) or fed to
//! an attached [`Interceptor`](intercept::Interceptor) (a reader, menu or
//! yes/no question) that temporarily takes over input.
//!
//! The [`network`] module serves sessions over TCP; the dispatcher itself is
//! transport-agnostic and can be driven directly with
//! [`Session::handle_line`].

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod intercept;
pub mod network;
pub mod session;
pub mod state;

pub use dispatch::DispatchResult;
pub use session::Session;
