//! # showmyslskd - Upload statistics for slskd
//!
//! Imports completed upload transfers from an slskd database into a local
//! reporting database and runs a fixed set of aggregate reports over it.
//!
//! showmyslskd provides:
//! - A streaming, cancellable import pipeline with progress reporting
//! - SQLite-backed storage for the normalized `UserTransfers` table
//! - Seven canned report templates with date range and search filters

pub mod transfer;
pub mod storage;
pub mod import;
pub mod report;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use transfer::{TransferRecord, UserTransfer, derive_artist};
pub use storage::{ReportStore, SourceStore};
pub use import::{CancelToken, ImportEvent, ImportHandle, ImportSummary, Importer};
pub use report::{DateRange, ReportEngine, ReportRequest, ReportTable, ReportTemplate};
pub use config::AppConfig;

/// Result type alias for showmyslskd operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for showmyslskd operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration missing: {0} is not set")]
    ConfigurationMissing(&'static str),

    #[error("No user config directory on this platform")]
    NoConfigDirectory,

    #[error("Not a reporting database (no UserTransfers table): {0}")]
    NotAReportDatabase(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Unknown report template: {0}")]
    UnknownTemplate(String),

    #[error("Unknown date range: {0}")]
    UnknownDateRange(String),

    #[error("Import worker failed: {0}")]
    Worker(String),
}
