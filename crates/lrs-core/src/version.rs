//! xAPI protocol version values.
//!
//! Clients declare the protocol version they speak in the
//! `X-Experience-API-Version` request header. The grammar accepted here is
//! `major.minor` or `major.minor.patch`, decimal digits only. A version that
//! parses is not necessarily supported; the supported set is a deployment
//! configuration checked by the server's negotiator, not by this type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed protocol version.
///
/// Whether a patch component was written is part of the value: `"1.0"` and
/// `"1.0.0"` parse to distinct, unequal versions, matching the exact-string
/// membership check against the supported set. The written form also drives
/// display, so `"1.0"` round-trips as `"1.0"` rather than `"1.0.0"`. Use
/// [`normalized`](Self::normalized) when only `major.minor` matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
    has_patch: bool,
}

impl Version {
    /// Creates a version with all three components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            has_patch: true,
        }
    }

    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    #[must_use]
    pub const fn patch(&self) -> u32 {
        self.patch
    }

    /// Returns the normalized `major.minor` identifier used for dispatch.
    ///
    /// Patch releases never change wire behavior, so handlers branch on the
    /// normalized form only.
    #[must_use]
    pub fn normalized(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_patch {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        } else {
            write!(f, "{}.{}", self.major, self.minor)
        }
    }
}

/// Error returned when a version string fails the grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version string: {0:?}")]
pub struct VersionParseError(pub String);

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError(s.to_string());

        let mut parts = s.split('.');
        let major = parse_component(parts.next()).ok_or_else(invalid)?;
        let minor = parse_component(parts.next()).ok_or_else(invalid)?;
        let patch = match parts.next() {
            Some(p) => Some(parse_component(Some(p)).ok_or_else(invalid)?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            major,
            minor,
            patch: patch.unwrap_or(0),
            has_patch: patch.is_some(),
        })
    }
}

/// Parses one dot-separated component: non-empty, digits only, no sign.
fn parse_component(part: Option<&str>) -> Option<u32> {
    let part = part?;
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
