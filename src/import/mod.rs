//! Import Pipeline - slskd uploads into the reporting database
//!
//! - `Importer::run` executes synchronously and reports progress to a callback
//! - `Importer::spawn` runs it on a worker thread and streams `ImportEvent`s
//! - `CancelToken` stops a run between read batches or between rows

pub mod cancel;
pub mod pipeline;
pub mod progress;
pub mod worker;

pub use cancel::CancelToken;
pub use pipeline::{DEFAULT_BATCH_SIZE, ImportSummary, Importer};
pub use worker::{ImportEvent, ImportHandle};
