//! Network module.
//!
//! Contains the Gateway (TCP listener), the per-client connection task, the
//! line codec and the application hooks run around each connection.

pub mod codec;
mod connection;
mod gateway;
mod hooks;

pub use codec::{Inbound, LineCodec};
pub use connection::ConnectionOptions;
pub use gateway::Gateway;
pub use hooks::{Hooks, NoHooks};
