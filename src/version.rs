//! API versions, the capability table, and stream strategy selection.
//!
//! Versions compare numerically per component (`1.9 < 1.10`), with missing
//! components treated as zero. The capability table is resolved once per
//! client into a [`Capabilities`] set and consulted as plain booleans.
//!
//! # Example
//!
//! ```
//! use dockwire_client::version::{select_strategy, ApiVersion, Capabilities, Capability, Strategy};
//!
//! let caps = Capabilities::resolve("1.5".parse::<ApiVersion>().unwrap());
//! assert!(!caps.supports(Capability::MultiplexedAttach));
//! assert_eq!(select_strategy(&caps, true), Strategy::RawChunked);
//!
//! let caps = Capabilities::resolve("1.17".parse().unwrap());
//! assert_eq!(select_strategy(&caps, true), Strategy::Live);
//! assert_eq!(select_strategy(&caps, false), Strategy::Buffered);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A dotted numeric API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component (rarely used by the daemon API).
    pub patch: u32,
}

impl ApiVersion {
    /// Create a `major.minor` version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            patch: 0,
        }
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidVersion(s.to_string());

        let mut parts = [0u32; 3];
        let mut count = 0;
        for piece in s.trim().split('.') {
            if count == parts.len() || piece.is_empty() {
                return Err(invalid());
            }
            parts[count] = piece.parse().map_err(|_| invalid())?;
            count += 1;
        }

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
        })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

/// Version-gated daemon features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Attach output uses the multiplexed frame format.
    MultiplexedAttach,
    /// Dedicated `/containers/{id}/logs` endpoint.
    LogsEndpoint,
    /// `tail` parameter on the logs endpoint.
    LogsTail,
    /// Exec instances.
    Exec,
    /// Streaming container stats.
    Stats,
    /// Container rename.
    Rename,
}

/// Minimum version for every capability, oldest first.
const CAPABILITY_TABLE: &[(Capability, ApiVersion)] = &[
    (Capability::MultiplexedAttach, ApiVersion::new(1, 6)),
    (Capability::LogsEndpoint, ApiVersion::new(1, 11)),
    (Capability::LogsTail, ApiVersion::new(1, 13)),
    (Capability::Exec, ApiVersion::new(1, 15)),
    (Capability::Stats, ApiVersion::new(1, 17)),
    (Capability::Rename, ApiVersion::new(1, 17)),
];

impl Capability {
    /// All capabilities in table order.
    pub fn all() -> impl Iterator<Item = Capability> {
        CAPABILITY_TABLE.iter().map(|(cap, _)| *cap)
    }

    /// Oldest API version that supports this capability.
    pub fn minimum(&self) -> ApiVersion {
        CAPABILITY_TABLE
            .iter()
            .find(|(cap, _)| cap == self)
            .map(|(_, min)| *min)
            .unwrap_or(ApiVersion::new(0, 0))
    }

    /// Human-readable feature name.
    pub fn name(&self) -> &'static str {
        match self {
            Capability::MultiplexedAttach => "Multiplexed attach",
            Capability::LogsEndpoint => "Logs endpoint",
            Capability::LogsTail => "Logs tail",
            Capability::Exec => "Exec",
            Capability::Stats => "Stats retrieval",
            Capability::Rename => "Rename",
        }
    }

    fn bit(&self) -> u32 {
        1 << (*self as u32)
    }
}

/// Capability set resolved for one negotiated version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    version: ApiVersion,
    bits: u32,
}

impl Capabilities {
    /// Resolve the table against `version`.
    pub fn resolve(version: ApiVersion) -> Self {
        let bits = CAPABILITY_TABLE
            .iter()
            .filter(|(_, min)| version >= *min)
            .fold(0, |acc, (cap, _)| acc | cap.bit());
        Self { version, bits }
    }

    /// The negotiated version.
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Check whether `cap` is available.
    #[inline]
    pub fn supports(&self, cap: Capability) -> bool {
        self.bits & cap.bit() != 0
    }

    /// Fail with [`Error::UnsupportedVersion`] unless `cap` is available.
    pub fn require(&self, cap: Capability) -> Result<()> {
        if self.supports(cap) {
            return Ok(());
        }
        Err(Error::UnsupportedVersion {
            feature: cap.name(),
            minimum: cap.minimum().to_string(),
            actual: self.version.to_string(),
        })
    }
}

/// How a response body is turned into output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Pre-multiplexing daemon: raw transfer chunks, no framing.
    RawChunked,
    /// Frames over a fully materialized body.
    Buffered,
    /// Frames pulled from the open connection.
    Live,
}

/// Pick the demultiplexing strategy for an attach-style response.
pub fn select_strategy(caps: &Capabilities, stream: bool) -> Strategy {
    if !caps.supports(Capability::MultiplexedAttach) {
        Strategy::RawChunked
    } else if stream {
        Strategy::Live
    } else {
        Strategy::Buffered
    }
}
