//! Connection handle shared by the session, the hub and the writer task.
//!
//! Writes never block: lines go into a bounded outgoing queue that the
//! connection's writer task drains. A full queue (slow consumer) drops the
//! line with a warning rather than stalling dispatch for everyone else.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::ConnectionId;

/// A cheaply cloneable handle to one connected client.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    id: ConnectionId,
    addr: SocketAddr,
    connected_at: DateTime<Utc>,
    name: RwLock<String>,
    outgoing: mpsc::Sender<String>,
}

impl Connection {
    /// Create a handle writing into `outgoing`.
    ///
    /// The display name starts out as the peer's host address.
    pub fn new(id: ConnectionId, addr: SocketAddr, outgoing: mpsc::Sender<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id,
                addr,
                connected_at: Utc::now(),
                name: RwLock::new(addr.ip().to_string()),
                outgoing,
            }),
        }
    }

    /// Create a handle together with the receiving end of its outgoing queue.
    pub fn channel(
        id: ConnectionId,
        addr: SocketAddr,
        sendq: usize,
    ) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(sendq.max(1));
        (Self::new(id, addr, tx), rx)
    }

    #[inline]
    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    #[inline]
    pub fn addr(&self) -> SocketAddr {
        self.inner.addr
    }

    #[inline]
    pub fn host(&self) -> IpAddr {
        self.inner.addr.ip()
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.inner.connected_at
    }

    /// Current display name.
    pub fn name(&self) -> String {
        self.inner.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.inner.name.write() = name.into();
    }

    /// Queue a single line for writing. Returns `false` if it was dropped.
    pub fn send_line(&self, line: impl Into<String>) -> bool {
        match self.inner.outgoing.try_send(line.into()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn = %self.inner.id, "SendQ overflow: client not reading, line dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(conn = %self.inner.id, "Write to closed connection ignored");
                false
            }
        }
    }

    /// Send text to the client, one line per `\n`-separated segment.
    pub fn notify(&self, text: impl AsRef<str>) {
        for line in text.as_ref().split('\n') {
            self.send_line(line.trim_end_matches('\r'));
        }
    }

    /// Whether the writer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.inner.outgoing.is_closed()
    }

    /// Whether two handles refer to the same connection.
    pub fn same(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("addr", &self.inner.addr)
            .field("name", &*self.inner.name.read())
            .finish()
    }
}
