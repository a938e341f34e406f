//! Connection identifier generation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a connection, stable for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw id. Mostly useful for tests and benches.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", base36_encode_6(self.0))
    }
}

/// Generates sequential connection ids.
pub struct IdGenerator {
    counter: AtomicU64,
}

/// Start at 1 so that 0 stays free as a sentinel for tests.
const ID_COUNTER_START: u64 = 1;

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(ID_COUNTER_START),
        }
    }

    /// Generate the next unique id.
    pub fn next(&self) -> ConnectionId {
        ConnectionId(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a number as a 6-character base36 string.
fn base36_encode_6(mut n: u64) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut result = [b'A'; 6];

    for slot in result.iter_mut().rev() {
        *slot = CHARS[(n % 36) as usize];
        n /= 36;
    }

    String::from_utf8_lossy(&result).into_owned()
}
