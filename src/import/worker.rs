use std::thread;
use crossbeam::channel::{self, Receiver};
use tracing::debug;
use crate::{Error, Result};
use super::cancel::CancelToken;
use super::pipeline::{ImportSummary, Importer};

/// Message sent from the import worker to its caller
#[derive(Debug)]
pub enum ImportEvent {
    /// Percentage checkpoint, never lower than the previous one
    Progress(u8),
    /// The run ended, possibly cancelled; its writes are committed
    Finished(ImportSummary),
    /// A storage error aborted the run; its writes were rolled back
    Failed(Error),
}

/// A running background import
pub struct ImportHandle {
    events: Receiver<ImportEvent>,
    cancel: CancelToken,
    thread: thread::JoinHandle<()>,
}

impl Importer {
    /// Run the import on a dedicated worker thread.
    ///
    /// Exactly one `Finished` or `Failed` event closes the event stream.
    pub fn spawn(self) -> Result<ImportHandle> {
        let (tx, rx) = channel::unbounded::<ImportEvent>();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let thread = thread::Builder::new()
            .name("import-worker".to_string())
            .spawn(move || {
                let progress_tx = tx.clone();
                let result = self.run(&token, |percent| {
                    progress_tx.send(ImportEvent::Progress(percent)).ok();
                });
                let event = match result {
                    Ok(summary) => ImportEvent::Finished(summary),
                    Err(e) => ImportEvent::Failed(e),
                };
                if tx.send(event).is_err() {
                    debug!("Import finished after its caller went away");
                }
            })?;

        Ok(ImportHandle { events: rx, cancel, thread })
    }
}

impl ImportHandle {
    /// Progress and completion events, in emission order
    pub fn events(&self) -> &Receiver<ImportEvent> {
        &self.events
    }

    /// Ask the worker to stop at its next checkpoint
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this import, e.g. from a signal handler
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Block until the import ends, discarding progress events
    pub fn wait(self) -> Result<ImportSummary> {
        let mut outcome = None;
        for event in self.events.iter() {
            match event {
                ImportEvent::Progress(_) => {}
                ImportEvent::Finished(summary) => {
                    outcome = Some(Ok(summary));
                    break;
                }
                ImportEvent::Failed(e) => {
                    outcome = Some(Err(e));
                    break;
                }
            }
        }
        self.join()?;
        outcome.unwrap_or_else(|| Err(Error::Worker("worker exited without a result".to_string())))
    }

    /// Wait for the worker thread to exit
    pub fn join(self) -> Result<()> {
        self.thread
            .join()
            .map_err(|_| Error::Worker("import worker panicked".to_string()))
    }
}
