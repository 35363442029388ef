//! Storage Layer - SQLite-backed persistence
//!
//! Two databases are involved:
//! - the slskd source database, read-only, table `Transfers`
//! - the reporting database, table `UserTransfers(Id, Username, Artist, ...)`

pub mod schema;
pub mod source;
pub mod sqlite;

pub use source::{EligibleBatches, EligibleQuery, SourceStore};
pub use sqlite::{InsertOutcome, ReportStore, StoreStats, TransferWriter, distinct_usernames_and_artists};
