//! Core data types for hostname probing.
//!
//! This module defines the data structures used throughout the library:
//! protocol tags, probe outcomes, run configuration, and progress state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default number of concurrent workers.
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Upper bound accepted for the worker count.
pub const MAX_CONCURRENCY: usize = 1000;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Status codes that count as "the server answered for this hostname".
///
/// Any definite response (success, redirect, not found) qualifies. Error
/// pages such as 403 or 503 do not, even though the server clearly listened.
pub const ACCEPTED_STATUSES: [u16; 4] = [200, 301, 302, 404];

/// A protocol a hostname can be reachable over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "http")]
    Http,
    #[serde(rename = "https")]
    Https,
}

impl Protocol {
    /// URL scheme for this protocol.
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Set of protocol tags a hostname answered on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolSet {
    pub http: bool,
    pub https: bool,
}

impl ProtocolSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a protocol to the set.
    pub fn insert(&mut self, protocol: Protocol) {
        match protocol {
            Protocol::Http => self.http = true,
            Protocol::Https => self.https = true,
        }
    }

    pub fn contains(&self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Http => self.http,
            Protocol::Https => self.https,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.http && !self.https
    }

    /// Protocols in the set, http first.
    pub fn iter(&self) -> impl Iterator<Item = Protocol> + '_ {
        [Protocol::Http, Protocol::Https]
            .into_iter()
            .filter(move |p| self.contains(*p))
    }
}

impl fmt::Display for ProtocolSet {
    /// Renders as `http`, `https`, or `http+https`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().map(|p| p.scheme()).collect();
        f.write_str(&joined.join("+"))
    }
}

/// Result of probing a single hostname.
///
/// Only outcomes with a non-empty protocol set are recorded in a run's
/// result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// The hostname that was sent in the Host header
    pub hostname: String,

    /// Protocols on which the server gave an accepted response
    pub protocols: ProtocolSet,
}

impl ProbeOutcome {
    pub fn new<H: Into<String>>(hostname: H, protocols: ProtocolSet) -> Self {
        Self {
            hostname: hostname.into(),
            protocols,
        }
    }

    /// Whether the hostname answered on at least one protocol.
    pub fn is_working(&self) -> bool {
        !self.protocols.is_empty()
    }
}

/// Configuration options for a probing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Number of concurrent workers (and the connection cap)
    /// Default: 50, Range: 1-1000
    pub concurrency: usize,

    /// Timeout for each individual HTTP or HTTPS request
    /// Default: 5 seconds
    #[serde(skip)]
    pub timeout: Duration,

    /// Port used for the plain HTTP probe
    /// Default: 80
    pub http_port: u16,

    /// Port used for the HTTPS probe
    /// Default: 443
    pub https_port: u16,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            http_port: 80,
            https_port: 443,
        }
    }
}

impl CheckConfig {
    /// Set the worker count, clamped to 1..=MAX_CONCURRENCY.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the HTTP and HTTPS ports.
    pub fn with_ports(mut self, http_port: u16, https_port: u16) -> Self {
        self.http_port = http_port;
        self.https_port = https_port;
        self
    }

    /// Port for the given protocol.
    pub fn port_for(&self, protocol: Protocol) -> u16 {
        match protocol {
            Protocol::Http => self.http_port,
            Protocol::Https => self.https_port,
        }
    }
}

/// Completion counters owned by the progress reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub completed: usize,
    pub total: usize,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }
}

/// Everything a finished run hands back to the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Working hostnames in completion order
    pub results: Vec<ProbeOutcome>,

    /// Final counters (`completed == total` for a full run)
    pub progress: ProgressState,

    /// Wall-clock duration of the run
    pub duration: Duration,
}
