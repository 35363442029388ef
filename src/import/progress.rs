//! Progress checkpoints of an import run
//!
//! Progress is an integer percentage that never goes backwards:
//! - 0 at start, 1 once both stores are open, 3 after counting,
//!   5 once the eligible-row query is running
//! - 7..=50 while reading, 50 when reading is over
//! - 50..=100 while writing

pub const STARTED: u8 = 0;
pub const STORES_OPENED: u8 = 1;
pub const COUNTED: u8 = 3;
pub const QUERY_EXECUTED: u8 = 5;
pub const READ_START: u8 = 7;
pub const READ_DONE: u8 = 50;
pub const WRITE_DONE: u8 = 100;

/// Percentage after `read` of `total` eligible rows have been buffered
pub fn read_progress(read: usize, total: usize) -> u8 {
    if total == 0 {
        return READ_DONE;
    }
    let span = (READ_DONE - READ_START) as usize;
    let scaled = READ_START as usize + read.saturating_mul(span) / total;
    scaled.min(READ_DONE as usize) as u8
}

/// Percentage after `written` of `buffered` rows have been decided
pub fn write_progress(written: usize, buffered: usize) -> u8 {
    if buffered == 0 {
        return WRITE_DONE;
    }
    let span = (WRITE_DONE - READ_DONE) as usize;
    let scaled = READ_DONE as usize + written.saturating_mul(span) / buffered;
    scaled.min(WRITE_DONE as usize) as u8
}

/// Forwards checkpoints to a callback, dropping repeats and regressions.
pub struct ProgressTracker<F: FnMut(u8)> {
    last: Option<u8>,
    on_progress: F,
}

impl<F: FnMut(u8)> ProgressTracker<F> {
    pub fn new(on_progress: F) -> Self {
        Self { last: None, on_progress }
    }

    pub fn emit(&mut self, percent: u8) {
        let percent = percent.min(WRITE_DONE);
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        (self.on_progress)(percent);
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }
}
