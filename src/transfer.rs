//! Transfer types
//!
//! - `TransferRecord`: a row of the slskd `Transfers` table (read-only input)
//! - `UserTransfer`: a normalized row of the reporting `UserTransfers` table

use serde::{Deserialize, Serialize};

/// Path marker that precedes the artist directory in a shared file path
pub const MUSIC_MARKER: &str = "/music/";

/// Artist assigned when the path carries no `/music/` segment
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Direction value of transfers we report on
pub const UPLOAD_DIRECTION: &str = "Upload";

/// Prefix shared by every terminal transfer state
pub const COMPLETED_STATE_PREFIX: &str = "Completed";

/// Derive the artist from a file path.
///
/// Returns the segment right after the first `/music/`, or `"Unknown"`
/// when the marker is absent. Matching is case-sensitive.
pub fn derive_artist(filename: &str) -> &str {
    let Some(start) = filename.find(MUSIC_MARKER) else {
        return UNKNOWN_ARTIST;
    };
    let rest = &filename[start + MUSIC_MARKER.len()..];
    match rest.find('/') {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// A transfer as stored by slskd.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: String,
    pub username: String,
    pub filename: String,
    pub size: i64,
    /// Null while the transfer is still in flight
    pub ended_at: Option<String>,
    pub bytes_transferred: i64,
    pub average_speed: f64,
    pub state: String,
    pub direction: String,
}

impl TransferRecord {
    /// Completed uploads with an end time are the only rows we import.
    pub fn is_eligible(&self) -> bool {
        self.direction == UPLOAD_DIRECTION
            && self.state.starts_with(COMPLETED_STATE_PREFIX)
            && self.ended_at.is_some()
    }
}

/// A normalized upload, one row of `UserTransfers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTransfer {
    /// Primary key, copied from the source transfer
    pub id: String,
    pub username: String,
    /// Derived from `filename` with [`derive_artist`]
    pub artist: String,
    pub filename: String,
    pub size: i64,
    pub ended_at: String,
    pub bytes_transferred: i64,
    pub average_speed: f64,
    pub state: String,
}

impl UserTransfer {
    /// Normalize a source record, deriving its artist.
    ///
    /// Returns `None` for records without an end time.
    pub fn from_record(record: TransferRecord) -> Option<Self> {
        let ended_at = record.ended_at?;
        let artist = derive_artist(&record.filename).to_string();
        Some(Self {
            id: record.id,
            username: record.username,
            artist,
            filename: record.filename,
            size: record.size,
            ended_at,
            bytes_transferred: record.bytes_transferred,
            average_speed: record.average_speed,
            state: record.state,
        })
    }
}
