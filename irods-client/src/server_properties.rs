//! Server properties reported by `GET_MISC_SVR_INFO_AN`.

use chrono::{DateTime, Utc};
use irods_protocol::{ProtocolError, Tag};
use std::fmt;

/// `serverType` value of a catalog-enabled server.
pub const RCAT_ENABLED: i32 = 1;

/// A parsed `rodsX.Y.Z` release string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ReleaseVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ReleaseVersion {
    /// Parses `rods4.2.8`, `4.2.8` or a prefix such as `rods4.1`.
    ///
    /// Returns `None` when no leading number is present.
    pub fn parse(release: &str) -> Option<Self> {
        let digits = release.trim_start_matches(|c: char| !c.is_ascii_digit());
        let mut parts = digits.split('.').map(|p| {
            let end = p.find(|c: char| !c.is_ascii_digit()).unwrap_or(p.len());
            p[..end].parse::<u32>().ok()
        });
        let major = parts.next().flatten()?;
        let minor = parts.next().flatten().unwrap_or(0);
        let patch = parts.next().flatten().unwrap_or(0);
        Some(Self {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rods{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Properties of the server a protocol is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProperties {
    pub icat_enabled: bool,
    pub boot_time: Option<DateTime<Utc>>,
    pub release_version: String,
    pub api_version: String,
    pub zone: String,
}

impl ServerProperties {
    /// Builds properties from a `MiscSvrInfo_PI` reply.
    pub fn from_tag(tag: &Tag) -> Result<Self, ProtocolError> {
        let boot = tag.child_long("serverBootTime")?;
        Ok(Self {
            icat_enabled: tag.child_int("serverType")? == RCAT_ENABLED,
            boot_time: DateTime::from_timestamp(boot, 0),
            release_version: tag.child_str("relVersion")?.to_string(),
            api_version: tag.child_str("apiVersion")?.to_string(),
            zone: tag.child_str("rodsZone")?.to_string(),
        })
    }

    pub fn version(&self) -> Option<ReleaseVersion> {
        ReleaseVersion::parse(&self.release_version)
    }

    /// Whether this is an iRODS 4 (or later) server.
    pub fn is_eirods(&self) -> bool {
        self.version().is_some_and(|v| v.major >= 4)
    }

    /// Whether the server release is at least `release` (e.g. `rods4.2.0`).
    pub fn is_at_least(&self, release: &str) -> bool {
        match (self.version(), ReleaseVersion::parse(release)) {
            (Some(ours), Some(wanted)) => ours >= wanted,
            _ => false,
        }
    }
}
