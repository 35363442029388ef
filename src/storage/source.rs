//! Read-only access to the slskd `Transfers` table

use std::path::Path;
use rusqlite::{Connection, OpenFlags, Rows, Statement};
use crate::Result;
use crate::transfer::TransferRecord;
use super::schema;

/// Read-only handle on an slskd database
pub struct SourceStore {
    conn: Connection,
}

impl SourceStore {
    /// Open an existing slskd database without write access.
    ///
    /// Fails if the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Wrap an already open connection (used by tests with in-memory sources)
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Count completed uploads that have an end time
    pub fn count_eligible(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(schema::COUNT_ELIGIBLE_TRANSFERS, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Prepare the eligible-row query
    pub fn eligible(&self) -> Result<EligibleQuery<'_>> {
        let stmt = self.conn.prepare(schema::SELECT_ELIGIBLE_TRANSFERS)?;
        Ok(EligibleQuery { stmt })
    }
}

/// Prepared query over eligible transfers
pub struct EligibleQuery<'conn> {
    stmt: Statement<'conn>,
}

impl EligibleQuery<'_> {
    /// Execute the query and read it back in chunks of `batch_size` rows
    pub fn batches(&mut self, batch_size: usize) -> Result<EligibleBatches<'_>> {
        let rows = self.stmt.query([])?;
        Ok(EligibleBatches { rows, batch_size: batch_size.max(1) })
    }
}

/// Cursor yielding eligible transfers a batch at a time
pub struct EligibleBatches<'stmt> {
    rows: Rows<'stmt>,
    batch_size: usize,
}

impl EligibleBatches<'_> {
    /// Fetch up to `batch_size` rows; `None` once the cursor is exhausted
    pub fn next_batch(&mut self) -> Result<Option<Vec<TransferRecord>>> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.rows.next()? {
                Some(row) => batch.push(row_to_record(row)?),
                None => break,
            }
        }
        Ok(if batch.is_empty() { None } else { Some(batch) })
    }
}

/// Helper to convert a `Transfers` row to a TransferRecord
fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TransferRecord> {
    Ok(TransferRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        filename: row.get(2)?,
        size: row.get(3)?,
        ended_at: row.get(4)?,
        bytes_transferred: row.get(5)?,
        average_speed: row.get(6)?,
        state: row.get(7)?,
        direction: row.get(8)?,
    })
}
