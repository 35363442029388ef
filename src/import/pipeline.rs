//! Source-to-report import
//!
//! Reads eligible uploads from slskd in batches, normalizes them and writes
//! the ones whose Id is not yet stored. All writes of a run share one
//! transaction: it is committed when the run ends, cancelled or not, and
//! rolled back if a storage error aborts the run.

use std::path::{Path, PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};
use crate::Result;
use crate::config::AppConfig;
use crate::storage::{InsertOutcome, ReportStore, SourceStore};
use crate::transfer::UserTransfer;
use super::cancel::CancelToken;
use super::progress::{self as checkpoint, ProgressTracker, read_progress, write_progress};

/// Rows fetched from the source per read
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Counts reported when an import ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub new_records: usize,
    pub skipped_records: usize,
    /// The run stopped early; counts cover only the rows decided before that
    pub cancelled: bool,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} new records added, {} duplicates skipped", self.new_records, self.skipped_records)?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// An import from an slskd database into a reporting database
#[derive(Debug, Clone)]
pub struct Importer {
    source: PathBuf,
    target: PathBuf,
    overwrite: bool,
    batch_size: usize,
}

impl Importer {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            overwrite: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Build an importer from the configured database paths
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(config.input_db()?, config.output_db()?))
    }

    /// Record the caller's overwrite choice.
    ///
    /// Existing Ids are skipped either way; the flag is only logged.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn is_overwrite(&self) -> bool {
        self.overwrite
    }

    /// Open both databases and run the import, reporting progress to `on_progress`
    pub fn run<F: FnMut(u8)>(&self, cancel: &CancelToken, on_progress: F) -> Result<ImportSummary> {
        let mut progress = ProgressTracker::new(on_progress);
        progress.emit(checkpoint::STARTED);
        info!("Importing {} into {}", self.source.display(), self.target.display());

        let mut target = ReportStore::open(&self.target)?;
        let source = SourceStore::open(&self.source)?;
        self.transfer(&source, &mut target, cancel, &mut progress)
    }

    /// Run the import between already open stores
    pub fn run_with_stores<F: FnMut(u8)>(
        &self,
        source: &SourceStore,
        target: &mut ReportStore,
        cancel: &CancelToken,
        on_progress: F,
    ) -> Result<ImportSummary> {
        let mut progress = ProgressTracker::new(on_progress);
        progress.emit(checkpoint::STARTED);
        target.initialize()?;
        self.transfer(source, target, cancel, &mut progress)
    }

    fn transfer<F: FnMut(u8)>(
        &self,
        source: &SourceStore,
        target: &mut ReportStore,
        cancel: &CancelToken,
        progress: &mut ProgressTracker<F>,
    ) -> Result<ImportSummary> {
        progress.emit(checkpoint::STORES_OPENED);
        if self.overwrite {
            warn!("Overwrite requested: transfers already in the target are kept and counted as skipped");
        }

        let total = source.count_eligible()?;
        progress.emit(checkpoint::COUNTED);
        if total == 0 {
            info!("No eligible uploads to import");
            progress.emit(checkpoint::WRITE_DONE);
            return Ok(ImportSummary::default());
        }
        debug!(total, "Counted eligible uploads");

        // Phase 1: buffer eligible rows
        let mut summary = ImportSummary::default();
        let mut buffered = Vec::new();
        {
            let mut query = source.eligible()?;
            let mut batches = query.batches(self.batch_size)?;
            progress.emit(checkpoint::QUERY_EXECUTED);

            loop {
                if cancel.is_cancelled() {
                    summary.cancelled = true;
                    break;
                }
                let Some(batch) = batches.next_batch()? else {
                    break;
                };
                buffered.extend(batch);
                debug!(read = buffered.len(), total, "Read batch");
                progress.emit(read_progress(buffered.len(), total));
            }
        }
        progress.emit(checkpoint::READ_DONE);

        // Phase 2: deduplicate and write
        target.initialize()?;
        let writer = target.writer()?;
        let buffered_count = buffered.len();
        for (index, record) in buffered.into_iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            match UserTransfer::from_record(record) {
                Some(transfer) => match writer.insert_if_absent(&transfer)? {
                    InsertOutcome::Inserted => summary.new_records += 1,
                    InsertOutcome::Skipped => summary.skipped_records += 1,
                },
                None => debug!("Skipping transfer without an end time"),
            }
            progress.emit(write_progress(index + 1, buffered_count));
        }
        writer.commit()?;

        if summary.cancelled {
            warn!(
                new = summary.new_records,
                skipped = summary.skipped_records,
                "Import cancelled; rows decided so far were kept"
            );
        } else {
            progress.emit(checkpoint::WRITE_DONE);
            info!(new = summary.new_records, skipped = summary.skipped_records, "Import complete");
        }
        Ok(summary)
    }
}
