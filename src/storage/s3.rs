use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{TryStream, TryStreamExt};
use opendal::{services::S3, Entry, Operator};
use std::collections::HashMap;
use std::time::SystemTime;

use crate::config::StorageSettings;
use crate::error::{CollectionError, ConfigurationError};
use crate::inventory::{ListPage, ListRequest, ObjectListing, ObjectSummary};
use crate::storage::S3Provider;

/// Bucket listing for S3 and S3-compatible storage using OpenDAL
///
/// One operator is built per bucket up front and reused for every page.
pub struct S3Listing {
    operators: HashMap<String, Operator>,
    provider: S3Provider,
}

impl S3Listing {
    /// Build operators for every bucket named in the configuration
    ///
    /// Credentials come from the settings when given, otherwise OpenDAL's
    /// default chain is used (environment variables, shared credentials file,
    /// instance profile).
    pub fn new<'a>(
        settings: &StorageSettings,
        buckets: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ConfigurationError> {
        let mut operators = HashMap::new();
        for bucket in buckets {
            if !operators.contains_key(bucket) {
                operators.insert(bucket.to_string(), Self::build_operator(settings, bucket)?);
            }
        }

        Ok(Self {
            operators,
            provider: settings.provider,
        })
    }

    fn build_operator(settings: &StorageSettings, bucket: &str) -> Result<Operator, ConfigurationError> {
        let mut builder = S3::default().bucket(bucket);

        if let Some(region) = settings.region.as_deref() {
            builder = builder.region(region);
        }

        let endpoint = settings.endpoint.clone().or_else(|| {
            settings
                .provider
                .endpoint(settings.region.as_deref().unwrap_or_default())
        });
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint(&endpoint);
        }

        // Without explicit keys OpenDAL falls back to the AWS credential chain
        if let (Some(key), Some(secret)) = (
            settings.access_key_id.as_deref(),
            settings.secret_access_key.as_deref(),
        ) {
            builder = builder.access_key_id(key).secret_access_key(secret);
        }

        let operator = Operator::new(builder)
            .map_err(|e| ConfigurationError::Storage {
                message: format!("bucket '{}': {}", bucket, e),
            })?
            .finish();

        Ok(operator)
    }

    /// Verify every bucket answers before any inventory is built
    pub async fn check(&self) -> Result<(), ConfigurationError> {
        for (bucket, operator) in &self.operators {
            operator
                .check()
                .await
                .map_err(|e| ConfigurationError::UnreachableBucket {
                    bucket: bucket.clone(),
                    message: e.to_string(),
                })?;
            tracing::debug!(bucket = %bucket, provider = self.provider.display_name(), "Bucket reachable");
        }
        Ok(())
    }
}

/// The parts of a listing entry a page is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListedEntry {
    key: String,
    is_dir: bool,
    size: u64,
    last_modified: Option<DateTime<Utc>>,
}

impl ListedEntry {
    fn from_entry(entry: &Entry) -> Self {
        let meta = entry.metadata();
        Self {
            key: entry.path().to_string(),
            is_dir: meta.mode().is_dir(),
            size: meta.content_length(),
            last_modified: meta.last_modified().map(to_utc),
        }
    }

    fn is_root_marker(&self) -> bool {
        self.key.is_empty() || self.key == "/"
    }
}

/// Take up to `max_keys` entries off a listing stream.
///
/// The root marker is skipped without using a slot. Directory entries keep
/// their place but report size 0. One entry past the page is read to tell
/// whether the listing is truncated.
async fn take_page<S>(mut entries: S, max_keys: usize) -> Result<(Vec<ListedEntry>, bool), opendal::Error>
where
    S: TryStream<Ok = ListedEntry, Error = opendal::Error> + Unpin,
{
    let mut items = Vec::with_capacity(max_keys);

    while let Some(mut entry) = entries.try_next().await? {
        if entry.is_root_marker() {
            continue;
        }
        if items.len() == max_keys {
            return Ok((items, true));
        }
        if entry.is_dir {
            entry.size = 0;
        }
        items.push(entry);
    }

    Ok((items, false))
}

fn to_utc(time: impl Into<SystemTime>) -> DateTime<Utc> {
    DateTime::<Utc>::from(time.into())
}

/// Timestamp of an object whose listing and stat both lacked one.
fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from(SystemTime::UNIX_EPOCH)
}

#[async_trait]
impl ObjectListing for S3Listing {
    async fn list_page(&self, request: ListRequest<'_>) -> Result<ListPage, CollectionError> {
        let operator = self
            .operators
            .get(request.bucket)
            .ok_or_else(|| CollectionError::UnknownBucket {
                bucket: request.bucket.to_string(),
            })?;

        let listing_error = |e: opendal::Error| CollectionError::Listing {
            bucket: request.bucket.to_string(),
            start_after: request.start_after.unwrap_or_default().to_string(),
            message: e.to_string(),
        };

        let mut future = operator
            .lister_with(request.prefix)
            .recursive(true)
            .limit(request.max_keys);
        if let Some(start_after) = request.start_after {
            future = future.start_after(start_after);
        }
        let lister = future.await.map_err(listing_error)?;

        let entries = lister.map_ok(|entry| ListedEntry::from_entry(&entry));
        let (entries, is_truncated) = take_page(entries, request.max_keys)
            .await
            .map_err(listing_error)?;

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let last_modified = match entry.last_modified {
                Some(time) => time,
                // Some services omit timestamps from listings
                None => operator
                    .stat(&entry.key)
                    .await
                    .map_err(listing_error)?
                    .last_modified()
                    .map(to_utc)
                    .unwrap_or_else(epoch),
            };
            items.push(ObjectSummary {
                key: entry.key,
                size: entry.size,
                last_modified,
            });
        }

        Ok(ListPage { items, is_truncated })
    }
}
