//! Application hooks run around a connection's lifetime.

use crate::commands::Caller;
use crate::state::{Connection, Hub};

/// Callbacks the gateway runs for the server and for every connection.
///
/// `on_start` runs once the listener is bound, before the first connection is
/// accepted; `on_stop` runs after the gateway stops accepting. `on_connect` runs after the welcome lines are sent and the default
/// registry is attached; anything it requests through the caller (attaching
/// a prompt, say) is applied before the first line is read. `on_disconnect`
/// runs once the connection has left the hub.
pub trait Hooks: Send + Sync + 'static {
    fn on_start(&self, hub: &Hub) {
        let _ = hub;
    }

    fn on_stop(&self, hub: &Hub) {
        let _ = hub;
    }

    fn on_connect(&self, caller: &mut Caller<'_>) {
        let _ = caller;
    }

    fn on_disconnect(&self, connection: &Connection, hub: &Hub, reason: &str) {
        let _ = (connection, hub, reason);
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl Hooks for NoHooks {}
