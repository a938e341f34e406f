//! State management module.
//!
//! Contains the Hub (shared server state) and the per-connection handle.

mod connection;
mod hub;
mod id;

pub use connection::Connection;
pub use hub::Hub;
pub use id::{ConnectionId, IdGenerator};
