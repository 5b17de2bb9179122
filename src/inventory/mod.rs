//! File inventories.
//!
//! An inventory is the list of files one side of a mapping holds: the local
//! tree (see [`local`]) or the bucket (see [`remote`]). Both sides produce
//! [`FileRecord`]s whose `logical_path` is comparable across sides.

pub mod exclude;
pub mod local;
pub mod remote;

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::Serialize;
use std::fmt;

pub use exclude::ExcludePatterns;
pub use local::{collect_local, collect_local_until};
pub use remote::{collect_remote, ListPage, ListRequest, ObjectListing, ObjectSummary};

/// Default reporting timezone offset (UTC+9).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 9 * 60;

/// Default number of keys requested per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// One file on either side of a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub size_bytes: u64,
    pub modified_at: DateTime<FixedOffset>,
    pub logical_path: String,
}

impl FileRecord {
    pub fn new(
        size_bytes: u64,
        modified_at: DateTime<FixedOffset>,
        logical_path: impl Into<String>,
    ) -> Self {
        Self {
            size_bytes,
            modified_at,
            logical_path: logical_path.into(),
        }
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}  {} bytes  {}",
            self.logical_path,
            self.size_bytes,
            self.modified_at.to_rfc3339()
        )
    }
}

/// Fixed timezone every timestamp is localized to before comparison and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingZone(FixedOffset);

impl ReportingZone {
    /// Build a zone from an offset east of UTC, in minutes.
    ///
    /// Returns `None` when the offset is outside ±24h.
    pub fn from_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self)
    }

    pub fn offset(&self) -> FixedOffset {
        self.0
    }

    pub fn localize<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> DateTime<FixedOffset> {
        time.with_timezone(&self.0)
    }
}

impl Default for ReportingZone {
    fn default() -> Self {
        match Self::from_minutes(DEFAULT_UTC_OFFSET_MINUTES) {
            Some(zone) => zone,
            None => unreachable!("default offset is within ±24h"),
        }
    }
}
