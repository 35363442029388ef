//! Database schema definitions

/// SQL to create the normalized transfers table
pub const CREATE_USER_TRANSFERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS UserTransfers (
    Id TEXT PRIMARY KEY,
    Username TEXT NOT NULL,
    Artist TEXT NOT NULL,
    Filename TEXT NOT NULL,
    Size INTEGER NOT NULL,
    EndedAt TEXT NOT NULL,
    BytesTransferred INTEGER NOT NULL,
    AverageSpeed REAL NOT NULL,
    State TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_username ON UserTransfers (Username)",
    "CREATE INDEX IF NOT EXISTS idx_endedat ON UserTransfers (EndedAt)",
    "CREATE INDEX IF NOT EXISTS idx_artist ON UserTransfers (Artist)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_USER_TRANSFERS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// Source-side filter for rows worth importing.
///
/// Must stay in sync with `TransferRecord::is_eligible`.
pub const ELIGIBLE_FILTER: &str =
    "Direction = 'Upload' AND State GLOB 'Completed*' AND EndedAt IS NOT NULL";

/// Count of eligible rows in the slskd `Transfers` table
pub const COUNT_ELIGIBLE_TRANSFERS: &str = concat!(
    "SELECT COUNT(*) FROM Transfers WHERE ",
    "Direction = 'Upload' AND State GLOB 'Completed*' AND EndedAt IS NOT NULL"
);

/// Eligible rows of the slskd `Transfers` table, in table order
pub const SELECT_ELIGIBLE_TRANSFERS: &str = concat!(
    "SELECT Id, Username, Filename, Size, EndedAt, BytesTransferred, AverageSpeed, State, Direction ",
    "FROM Transfers WHERE ",
    "Direction = 'Upload' AND State GLOB 'Completed*' AND EndedAt IS NOT NULL"
);
