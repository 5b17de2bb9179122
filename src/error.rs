// Centralized error handling module
// Errors raised while loading configuration and building inventories

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while building an inventory for one mapping.
///
/// Collection errors are never retried; the runner records them against the
/// mapping that produced them.
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("Local root not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("Failed to walk {}: {message}", root.display())]
    Walk { root: PathBuf, message: String },

    #[error("I/O error while {operation} {}: {source}", path.display())]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to list bucket '{bucket}' after key '{start_after}': {message}")]
    Listing {
        bucket: String,
        start_after: String,
        message: String,
    },

    #[error("No storage client configured for bucket '{bucket}'")]
    UnknownBucket { bucket: String },

    #[error("Collection task for '{mapping}' did not finish: {message}")]
    Task { mapping: String, message: String },

    #[error("Walk of {} was cancelled", root.display())]
    Cancelled { root: PathBuf },
}

impl CollectionError {
    /// Create an Io error, mapping NotFound on the walk root to `RootNotFound`
    pub fn from_io_error(err: io::Error, operation: &str, path: PathBuf) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound if operation == "walking" => {
                CollectionError::RootNotFound { path }
            }
            _ => CollectionError::Io {
                path,
                operation: operation.to_string(),
                source: err,
            },
        }
    }
}

/// Problems with the configuration, surfaced before any reconciliation.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Config file not found: {}\nSuggestion: pass --config or create {}", path.display(), path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No config file given and no config directory available on this platform")]
    NoConfigDir,

    #[error("Config defines no [[mapping]] entries")]
    NoMappings,

    #[error("Mapping #{index}: {message}")]
    InvalidMapping { index: usize, message: String },

    #[error("Local root of mapping '{mapping}' is not a directory: {}", path.display())]
    LocalRootMissing { mapping: String, path: PathBuf },

    #[error("Duplicate mapping name '{name}'")]
    DuplicateName { name: String },

    #[error("Unknown mapping '{name}'\nSuggestion: known mappings are {known}")]
    UnknownMapping { name: String, known: String },

    #[error("Invalid exclude pattern '{pattern}' in mapping '{mapping}': {message}")]
    InvalidPattern {
        mapping: String,
        pattern: String,
        message: String,
    },

    #[error("Invalid storage settings: {message}")]
    Storage { message: String },

    #[error("Bucket '{bucket}' is not reachable: {message}")]
    UnreachableBucket { bucket: String, message: String },

    #[error("{message}")]
    Invalid { message: String },
}

/// Any error the runner can surface.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
