//! Timeout, retry and pool settings threaded explicitly through each call.
//!
//! All three are plain `serde` values with `Default`s, so callers can embed
//! them in whatever configuration format they already load.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connect and read timeouts handed verbatim to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeout {
    pub connection_timeout: Duration,
    pub read_timeout: Duration,
}

impl Timeout {
    pub fn new(connection_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            connection_timeout,
            read_timeout,
        }
    }

    /// The `(connect, read)` pair sent with every request.
    pub fn pair(&self) -> (Duration, Duration) {
        (self.connection_timeout, self.read_timeout)
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(3))
    }
}

/// Retry policy applied by an adapter against a single host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySpec {
    /// Extra attempts after the first one.
    pub total: u32,
    /// Response statuses that trigger a retry of idempotent requests.
    pub status_forcelist: Vec<u16>,
}

impl RetrySpec {
    pub fn none() -> Self {
        Self {
            total: 0,
            status_forcelist: Vec::new(),
        }
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }
}

impl Default for RetrySpec {
    fn default() -> Self {
        Self {
            total: 1,
            status_forcelist: vec![500, 502, 503, 504],
        }
    }
}

/// Connection pool sizing for an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Idle connections kept across all hosts.
    pub connections: usize,
    /// Idle connections kept per host.
    pub maxsize: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            connections: 10,
            maxsize: 10,
        }
    }
}
