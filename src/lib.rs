// Library module for bucketdiff
// Re-exports modules for use in integration tests and the binary

pub mod config;
pub mod error;
pub mod inventory;
pub mod reconcile;
pub mod report;
pub mod runner;
pub mod storage;

pub use config::{Config, DirectoryMapping};
pub use error::{CollectionError, ConfigurationError, SyncError};
pub use inventory::FileRecord;
pub use reconcile::{reconcile, reconcile_with, Reconciliation, ScanBoundary};
pub use runner::{MappingOutcome, MappingReport, RunSettings, SyncRunner};
