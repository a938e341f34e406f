//! The Hub - shared state for every connection on this server.
//!
//! Holds the connection table, the banned host list and the server start
//! time in concurrent structures reachable from any connection task.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::debug;

use super::{Connection, ConnectionId, IdGenerator};

/// Central shared state container.
pub struct Hub {
    /// All connected clients, indexed by id.
    connections: DashMap<ConnectionId, Connection>,
    /// Hosts refused at accept time.
    banned: RwLock<HashSet<IpAddr>>,
    ids: IdGenerator,
    started: DateTime<Utc>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            banned: RwLock::new(HashSet::new()),
            ids: IdGenerator::new(),
            started: Utc::now(),
        }
    }

    /// Create a hub with an initial banned host list.
    pub fn with_banned(hosts: impl IntoIterator<Item = IpAddr>) -> Self {
        let hub = Self::new();
        hub.banned.write().extend(hosts);
        hub
    }

    /// Allocate an id for a new connection.
    pub fn next_id(&self) -> ConnectionId {
        self.ids.next()
    }

    pub fn insert(&self, connection: Connection) {
        debug!(conn = %connection.id(), addr = %connection.addr(), "Connection registered with hub");
        self.connections.insert(connection.id(), connection);
    }

    pub fn remove(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id).map(|(_, conn)| conn)
    }

    pub fn get(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.get(&id).map(|entry| entry.value().clone())
    }

    /// Snapshot of the current connections, oldest first.
    pub fn connections(&self) -> Vec<Connection> {
        let mut snapshot: Vec<Connection> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        snapshot.sort_by_key(Connection::id);
        snapshot
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Find a connection by display name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<Connection> {
        self.connections
            .iter()
            .find(|entry| entry.value().name().eq_ignore_ascii_case(name))
            .map(|entry| entry.value().clone())
    }

    /// Send text to every connection in a snapshot taken now.
    ///
    /// Returns how many connections accepted every line. A connection that
    /// has gone away or is backed up does not stop delivery to the others.
    pub fn broadcast(&self, text: impl AsRef<str>) -> usize {
        let text = text.as_ref();
        let mut delivered = 0;
        for conn in self.connections() {
            let mut ok = true;
            for line in text.split('\n') {
                ok &= conn.send_line(line.trim_end_matches('\r'));
            }
            if ok {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn is_banned(&self, host: &IpAddr) -> bool {
        self.banned.read().contains(host)
    }

    /// Returns `false` if the host was already banned.
    pub fn ban(&self, host: IpAddr) -> bool {
        self.banned.write().insert(host)
    }

    /// Returns `false` if the host was not banned.
    pub fn unban(&self, host: &IpAddr) -> bool {
        self.banned.write().remove(host)
    }

    pub fn banned(&self) -> Vec<IpAddr> {
        let mut hosts: Vec<IpAddr> = self.banned.read().iter().copied().collect();
        hosts.sort();
        hosts
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
