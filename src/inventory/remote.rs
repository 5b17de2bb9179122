//! Remote side of a mapping: a paged listing of the bucket.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::local::join_logical;
use super::{ExcludePatterns, FileRecord, ReportingZone};
use crate::error::CollectionError;

/// One page request against a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest<'a> {
    pub bucket: &'a str,
    pub prefix: &'a str,
    pub max_keys: usize,
    /// Exclusive lower bound: only keys sorting after this one are returned.
    pub start_after: Option<&'a str>,
}

/// Object metadata as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// One page of a listing, in ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<ObjectSummary>,
    /// More keys remain after the last item of this page.
    pub is_truncated: bool,
}

/// Key-ordered, resumable bucket listing.
///
/// Implementations must return keys in lexicographic order and honour
/// `start_after` as an exclusive bound.
#[async_trait]
pub trait ObjectListing: Send + Sync {
    async fn list_page(&self, request: ListRequest<'_>) -> Result<ListPage, CollectionError>;
}

/// Collect every non-empty object of `bucket`.
///
/// Pages are fetched one after another, each starting after the last key of
/// the previous page. Zero-byte objects are dropped. Each record's logical
/// path is `bucket/key`.
pub async fn collect_remote(
    listing: &dyn ObjectListing,
    bucket: &str,
    page_size: usize,
    excludes: &ExcludePatterns,
    zone: ReportingZone,
) -> Result<Vec<FileRecord>, CollectionError> {
    let mut records = Vec::new();
    let mut last_key: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = listing
            .list_page(ListRequest {
                bucket,
                prefix: "",
                max_keys: page_size,
                start_after: last_key.as_deref(),
            })
            .await?;
        pages += 1;

        tracing::debug!(
            bucket,
            page = pages,
            items = page.items.len(),
            truncated = page.is_truncated,
            "Listed page"
        );

        let Some(last) = page.items.last() else {
            if page.is_truncated {
                tracing::warn!(bucket, page = pages, "Listing returned an empty page but claims more; stopping");
            }
            break;
        };
        let next_key = last.key.clone();

        for object in page.items {
            if object.size == 0 || excludes.is_excluded(&object.key) {
                continue;
            }
            records.push(FileRecord::new(
                object.size,
                zone.localize(&object.last_modified),
                join_logical(bucket, &object.key),
            ));
        }

        if !page.is_truncated {
            break;
        }
        last_key = Some(next_key);
    }

    tracing::debug!(bucket, pages, objects = records.len(), "Remote inventory collected");
    Ok(records)
}
