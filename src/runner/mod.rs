//! Runs the reconciliation for each configured mapping.
//!
//! For every mapping the remote and local inventories are collected
//! concurrently, then handed to the reconciler. A mapping whose collection
//! fails is reported as failed; whether the run continues with the next one
//! depends on [`RunSettings::fail_fast`]. When the listing fails first, the
//! local walk of that mapping stops at its next entry.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, DirectoryMapping};
use crate::error::{CollectionError, ConfigurationError, SyncError};
use crate::inventory::{collect_local_until, collect_remote, ObjectListing, ReportingZone, DEFAULT_PAGE_SIZE};
use crate::reconcile::{reconcile_with, Reconciliation, ScanBoundary};

/// Knobs for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub zone: ReportingZone,
    pub page_size: usize,
    pub boundary: ScanBoundary,
    /// Stop at the first mapping that fails.
    pub fail_fast: bool,
    /// Mappings processed at the same time.
    pub jobs: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            zone: ReportingZone::default(),
            page_size: DEFAULT_PAGE_SIZE,
            boundary: ScanBoundary::default(),
            fail_fast: false,
            jobs: 1,
        }
    }
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        Ok(Self {
            zone: config.reporting_zone()?,
            page_size: config.page_size,
            boundary: config.scan_boundary(),
            fail_fast: config.fail_fast,
            jobs: config.jobs.max(1),
        })
    }
}

/// Result of reconciling one mapping.
#[derive(Debug, Clone, Serialize)]
pub struct MappingReport {
    pub name: String,
    pub bucket: String,
    pub local_root: PathBuf,
    pub remote_files: usize,
    pub local_files: usize,
    #[serde(flatten)]
    pub reconciliation: Reconciliation,
}

/// A mapping together with what happened to it.
#[derive(Debug)]
pub struct MappingOutcome {
    pub name: String,
    pub result: Result<MappingReport, SyncError>,
}

impl MappingOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Collects inventories and reconciles them, mapping by mapping.
pub struct SyncRunner {
    listing: Arc<dyn ObjectListing>,
    settings: RunSettings,
}

impl SyncRunner {
    pub fn new(listing: Arc<dyn ObjectListing>, settings: RunSettings) -> Self {
        Self { listing, settings }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Reconcile a single mapping.
    pub async fn run_mapping(&self, mapping: &DirectoryMapping) -> Result<MappingReport, SyncError> {
        let started = Instant::now();
        let excludes = mapping.excludes()?;
        let zone = self.settings.zone;

        tracing::info!(
            mapping = mapping.name(),
            bucket = %mapping.bucket,
            local_root = %mapping.local_root.display(),
            "Reconciling mapping"
        );

        let remote = collect_remote(
            self.listing.as_ref(),
            &mapping.bucket,
            self.settings.page_size,
            &excludes,
            zone,
        );

        // The walk is blocking; keep it off the runtime threads. It cannot be
        // aborted, so a failed listing raises the flag it polls instead.
        let cancel = Arc::new(AtomicBool::new(false));
        let local = {
            let root = mapping.local_root.clone();
            let prefix = mapping.logical_prefix().to_string();
            let excludes = excludes.clone();
            let name = mapping.name().to_string();
            let cancel = Arc::clone(&cancel);
            async move {
                tokio::task::spawn_blocking(move || collect_local_until(&root, &prefix, &excludes, zone, &cancel))
                    .await
                    .map_err(|e| CollectionError::Task {
                        mapping: name,
                        message: e.to_string(),
                    })?
            }
        };

        let collected = tokio::try_join!(remote, local);
        if collected.is_err() {
            cancel.store(true, Ordering::Relaxed);
        }
        let (remote, local) = collected?;
        let (remote_files, local_files) = (remote.len(), local.len());

        let reconciliation = reconcile_with(remote, local, self.settings.boundary);

        tracing::info!(
            mapping = mapping.name(),
            remote_files,
            local_files,
            to_upload = reconciliation.upload_count(),
            to_delete = reconciliation.delete_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Mapping reconciled"
        );

        Ok(MappingReport {
            name: mapping.name().to_string(),
            bucket: mapping.bucket.clone(),
            local_root: mapping.local_root.clone(),
            remote_files,
            local_files,
            reconciliation,
        })
    }

    /// Reconcile every mapping, returning outcomes in the given order.
    ///
    /// With `fail_fast` the run stops after the first failure and later
    /// mappings are absent from the result.
    pub async fn run(&self, mappings: &[DirectoryMapping]) -> Vec<MappingOutcome> {
        let mut outcomes = Vec::with_capacity(mappings.len());

        let mut pending = stream::iter(mappings)
            .map(|mapping| async move {
                MappingOutcome {
                    name: mapping.name().to_string(),
                    result: self.run_mapping(mapping).await,
                }
            })
            .buffered(self.settings.jobs.max(1));

        while let Some(outcome) = pending.next().await {
            let failed = match &outcome.result {
                Ok(_) => false,
                Err(e) => {
                    tracing::error!(mapping = %outcome.name, error = %e, "Mapping failed");
                    true
                }
            };
            outcomes.push(outcome);

            if failed && self.settings.fail_fast {
                tracing::warn!(
                    skipped = mappings.len() - outcomes.len(),
                    "Stopping after first failure"
                );
                break;
            }
        }

        outcomes
    }
}
