//! Merge-join diff between a remote and a local inventory.
//!
//! Both inventories are sorted by logical path and walked with one cursor
//! each. A path present on both sides is uploaded only when the remote copy is
//! strictly older than the local one; equal or newer remote copies count as in
//! sync. Remote-only paths are delete candidates and local-only paths are
//! upload candidates.

use serde::Serialize;
use std::cmp::Ordering;

use crate::inventory::FileRecord;

/// What happens to the unmatched tail once one side runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanBoundary {
    /// Stop as soon as either side is exhausted. Records left on the other
    /// side are not examined. Kept for output compatibility with older runs.
    StopAtExhaustion,
    /// Keep going: the rest of the remote side is deleted and the rest of the
    /// local side is uploaded (a full outer-join diff).
    #[default]
    DrainTails,
}

/// Upload and delete candidates for one mapping, both ordered by logical path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub to_upload: Vec<FileRecord>,
    pub to_delete: Vec<FileRecord>,
}

impl Reconciliation {
    pub fn upload_count(&self) -> usize {
        self.to_upload.len()
    }

    pub fn delete_count(&self) -> usize {
        self.to_delete.len()
    }

    /// Total bytes that an upload of every candidate would transfer.
    pub fn upload_bytes(&self) -> u64 {
        self.to_upload.iter().map(|r| r.size_bytes).sum()
    }

    pub fn is_in_sync(&self) -> bool {
        self.to_upload.is_empty() && self.to_delete.is_empty()
    }
}

/// Diff two inventories with the default [`ScanBoundary`].
pub fn reconcile(remote: Vec<FileRecord>, local: Vec<FileRecord>) -> Reconciliation {
    reconcile_with(remote, local, ScanBoundary::default())
}

/// Diff two inventories.
///
/// Input order does not matter; both sides are stable-sorted by logical path
/// first. Logical paths are assumed unique within each side.
pub fn reconcile_with(
    mut remote: Vec<FileRecord>,
    mut local: Vec<FileRecord>,
    boundary: ScanBoundary,
) -> Reconciliation {
    remote.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));
    local.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));

    let mut result = Reconciliation::default();
    let mut remote_iter = remote.into_iter().peekable();
    let mut local_iter = local.into_iter().peekable();

    while let (Some(re), Some(lo)) = (remote_iter.peek(), local_iter.peek()) {
        match re.logical_path.cmp(&lo.logical_path) {
            Ordering::Equal => {
                let upload = re.modified_at < lo.modified_at;
                remote_iter.next();
                if let Some(lo) = local_iter.next() {
                    if upload {
                        result.to_upload.push(lo);
                    }
                }
            }
            Ordering::Less => result.to_delete.extend(remote_iter.next()),
            Ordering::Greater => result.to_upload.extend(local_iter.next()),
        }
    }

    if boundary == ScanBoundary::DrainTails {
        result.to_delete.extend(remote_iter);
        result.to_upload.extend(local_iter);
    }

    result
}
