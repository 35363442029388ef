//! SQLite storage for the reporting database

use std::path::Path;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Transaction, params, params_from_iter};
use rusqlite::types::Value;
use crate::{Error, Result};
use crate::transfer::UserTransfer;
use super::schema;

const INSERT_USER_TRANSFER: &str = r#"
INSERT INTO UserTransfers (Id, Username, Artist, Filename, Size, EndedAt, BytesTransferred, AverageSpeed, State)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#;

/// Outcome of offering one transfer to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The Id was already present; nothing was written
    Skipped,
}

/// SQLite-backed reporting store holding `UserTransfers`
pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    /// Open a database file (creates if doesn't exist) and ensure the schema
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Open an existing reporting database for queries only.
    ///
    /// Never creates the file or the schema; a file without `UserTransfers`
    /// is rejected.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        if !has_user_transfers(&conn)? {
            return Err(Error::NotAReportDatabase(path.display().to_string()));
        }
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Ensure the table and its indexes exist. Safe to call repeatedly.
    pub fn initialize(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Write Operations ==========

    /// Insert a batch of transfers in a single transaction.
    ///
    /// No deduplication happens here: a duplicate Id fails the whole batch.
    pub fn batch_insert(&mut self, transfers: &[UserTransfer]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for transfer in transfers {
            insert_transfer(&tx, transfer)?;
        }
        tx.commit()?;
        Ok(transfers.len())
    }

    /// Start a write batch; dropping it without `commit` rolls back.
    pub fn writer(&mut self) -> Result<TransferWriter<'_>> {
        Ok(TransferWriter { tx: self.conn.transaction()? })
    }

    // ========== Read Operations ==========

    /// Check whether a transfer Id is already stored
    pub fn contains_id(&self, id: &str) -> Result<bool> {
        contains_id(&self.conn, id)
    }

    /// Check whether any row carries exactly this username
    pub fn contains_username(&self, username: &str) -> Result<bool> {
        let found = self.conn
            .query_row(
                "SELECT 1 FROM UserTransfers WHERE Username = ?1 LIMIT 1",
                [username],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Get a stored transfer by Id
    pub fn get_transfer(&self, id: &str) -> Result<Option<UserTransfer>> {
        self.conn
            .query_row(
                "SELECT Id, Username, Artist, Filename, Size, EndedAt, BytesTransferred, AverageSpeed, State FROM UserTransfers WHERE Id = ?1",
                [id],
                |row| self.row_to_transfer(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Count all stored transfers
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM UserTransfers", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Distinct usernames followed by distinct artists, for autocompletion
    pub fn distinct_usernames_and_artists(&self) -> Result<Vec<String>> {
        let mut names = self.distinct_column("SELECT DISTINCT Username FROM UserTransfers ORDER BY Username")?;
        names.extend(self.distinct_column("SELECT DISTINCT Artist FROM UserTransfers ORDER BY Artist")?);
        Ok(names)
    }

    fn distinct_column(&self, sql: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values)
    }

    /// Run a read-only query, returning column names and raw rows
    pub fn query_rows(&self, sql: &str, values: &[Value]) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = columns.len();

        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                (0..width).map(|i| row.get::<_, Value>(i)).collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((columns, rows))
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let (users, artists, earliest, latest) = self.conn.query_row(
            "SELECT COUNT(DISTINCT Username), COUNT(DISTINCT Artist), MIN(EndedAt), MAX(EndedAt) FROM UserTransfers",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )?;

        Ok(StoreStats {
            transfers: self.count()?,
            users: users as usize,
            artists: artists as usize,
            earliest,
            latest,
        })
    }

    /// Helper to convert a row to a UserTransfer
    fn row_to_transfer(&self, row: &rusqlite::Row) -> rusqlite::Result<UserTransfer> {
        Ok(UserTransfer {
            id: row.get(0)?,
            username: row.get(1)?,
            artist: row.get(2)?,
            filename: row.get(3)?,
            size: row.get(4)?,
            ended_at: row.get(5)?,
            bytes_transferred: row.get(6)?,
            average_speed: row.get(7)?,
            state: row.get(8)?,
        })
    }
}

/// Distinct usernames and artists of the store at `path`.
///
/// A missing file yields an empty list instead of an error, and the file
/// is never created.
pub fn distinct_usernames_and_artists(path: Option<&Path>) -> Result<Vec<String>> {
    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(Vec::new());
    };
    match ReportStore::open_read_only(path) {
        Ok(store) => store.distinct_usernames_and_artists(),
        Err(Error::NotAReportDatabase(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

fn has_user_transfers(conn: &Connection) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'UserTransfers'",
            [],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// One transaction's worth of inserts into `UserTransfers`
pub struct TransferWriter<'conn> {
    tx: Transaction<'conn>,
}

impl TransferWriter<'_> {
    /// Insert the transfer unless its Id is already stored
    pub fn insert_if_absent(&self, transfer: &UserTransfer) -> Result<InsertOutcome> {
        if contains_id(&self.tx, &transfer.id)? {
            return Ok(InsertOutcome::Skipped);
        }
        insert_transfer(&self.tx, transfer)?;
        Ok(InsertOutcome::Inserted)
    }

    /// Make every insert of this batch durable
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn contains_id(conn: &Connection, id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM UserTransfers WHERE Id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn insert_transfer(conn: &Connection, transfer: &UserTransfer) -> Result<()> {
    conn.prepare_cached(INSERT_USER_TRANSFER)?.execute(params![
        transfer.id,
        transfer.username,
        transfer.artist,
        transfer.filename,
        transfer.size,
        transfer.ended_at,
        transfer.bytes_transferred,
        transfer.average_speed,
        transfer.state,
    ])?;
    Ok(())
}

/// Reporting store statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub transfers: usize,
    pub users: usize,
    pub artists: usize,
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transfer(id: &str, username: &str, artist: &str) -> UserTransfer {
        UserTransfer {
            id: id.to_string(),
            username: username.to_string(),
            artist: artist.to_string(),
            filename: format!("/music/{}/track.flac", artist),
            size: 2_097_152,
            ended_at: "2024-05-01 12:00:00".to_string(),
            bytes_transferred: 2_097_152,
            average_speed: 512.0,
            state: "Completed, Succeeded".to_string(),
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut store = ReportStore::open_in_memory().unwrap();
        store.batch_insert(&[sample_transfer("A1", "alice", "Queen")]).unwrap();

        store.initialize().unwrap();
        store.initialize().unwrap();

        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_batch_insert_and_get() {
        let mut store = ReportStore::open_in_memory().unwrap();
        let inserted = store
            .batch_insert(&[sample_transfer("A1", "alice", "Queen"), sample_transfer("A2", "bob", "Muse")])
            .unwrap();
        assert_eq!(inserted, 2);

        let retrieved = store.get_transfer("A2").unwrap().unwrap();
        assert_eq!(retrieved.username, "bob");
        assert_eq!(retrieved.artist, "Muse");
        assert!(store.get_transfer("missing").unwrap().is_none());
    }

    #[test]
    fn test_batch_insert_rejects_duplicate_ids() {
        let mut store = ReportStore::open_in_memory().unwrap();
        store.batch_insert(&[sample_transfer("A1", "alice", "Queen")]).unwrap();

        let result = store.batch_insert(&[sample_transfer("A2", "bob", "Muse"), sample_transfer("A1", "carol", "Muse")]);
        assert!(matches!(result, Err(crate::Error::Storage(_))));
        // the failed batch leaves nothing behind
        assert_eq!(store.count().unwrap(), 1);
        assert!(!store.contains_id("A2").unwrap());
    }

    #[test]
    fn test_writer_skips_existing_ids() {
        let mut store = ReportStore::open_in_memory().unwrap();
        store.batch_insert(&[sample_transfer("A1", "alice", "Queen")]).unwrap();

        let writer = store.writer().unwrap();
        assert_eq!(writer.insert_if_absent(&sample_transfer("A1", "zed", "Muse")).unwrap(), InsertOutcome::Skipped);
        assert_eq!(writer.insert_if_absent(&sample_transfer("A2", "bob", "Muse")).unwrap(), InsertOutcome::Inserted);
        writer.commit().unwrap();

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get_transfer("A1").unwrap().unwrap().username, "alice");
    }

    #[test]
    fn test_writer_rolls_back_when_dropped() {
        let mut store = ReportStore::open_in_memory().unwrap();
        {
            let writer = store.writer().unwrap();
            writer.insert_if_absent(&sample_transfer("A1", "alice", "Queen")).unwrap();
        }
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_distinct_usernames_and_artists() {
        let mut store = ReportStore::open_in_memory().unwrap();
        store
            .batch_insert(&[
                sample_transfer("1", "bob", "Queen"),
                sample_transfer("2", "alice", "Queen"),
                sample_transfer("3", "alice", "Muse"),
            ])
            .unwrap();

        let names = store.distinct_usernames_and_artists().unwrap();
        assert_eq!(names, vec!["alice", "bob", "Muse", "Queen"]);
    }

    #[test]
    fn test_distinct_names_for_missing_store() {
        assert!(distinct_usernames_and_artists(None).unwrap().is_empty());

        let missing = std::env::temp_dir().join("showmyslskd-does-not-exist.db");
        assert!(distinct_usernames_and_artists(Some(missing.as_path())).unwrap().is_empty());
        assert!(!missing.exists());
    }

    #[test]
    fn test_open_read_only_leaves_foreign_database_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slskd.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE Transfers (Id TEXT PRIMARY KEY);")
            .unwrap();

        let result = ReportStore::open_read_only(&path);
        assert!(matches!(result, Err(Error::NotAReportDatabase(_))));
        assert!(distinct_usernames_and_artists(Some(path.as_path())).unwrap().is_empty());

        let conn = Connection::open(&path).unwrap();
        let tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE name = 'UserTransfers'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn test_open_read_only_does_not_create_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typo.db");

        assert!(matches!(ReportStore::open_read_only(&path), Err(Error::Storage(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_open_read_only_queries_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.db");
        ReportStore::open(&path)
            .unwrap()
            .batch_insert(&[sample_transfer("A1", "alice", "Queen")])
            .unwrap();

        let mut store = ReportStore::open_read_only(&path).unwrap();
        assert_eq!(store.stats().unwrap().transfers, 1);
        assert!(store.batch_insert(&[sample_transfer("A2", "bob", "Muse")]).is_err());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_stats() {
        let mut store = ReportStore::open_in_memory().unwrap();
        let mut early = sample_transfer("1", "alice", "Queen");
        early.ended_at = "2024-01-01 00:00:00".to_string();
        store.batch_insert(&[early, sample_transfer("2", "bob", "Queen")]).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.transfers, 2);
        assert_eq!(stats.users, 2);
        assert_eq!(stats.artists, 1);
        assert_eq!(stats.earliest.as_deref(), Some("2024-01-01 00:00:00"));
        assert_eq!(stats.latest.as_deref(), Some("2024-05-01 12:00:00"));
    }
}
