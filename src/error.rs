use std::path::PathBuf;

/// Failures raised while reading `places.sqlite` or an aggregation database.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Firefox holds the lock on `places.sqlite`. The user has to close the
    /// browser; retrying from here would just hit the same lock.
    #[error("database is locked: {}", path.display())]
    SourceLocked { path: PathBuf },

    /// A statement failed for any reason other than a lock.
    #[error("query failed: {source}\n\n{statement}\n")]
    Query {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A folder lookup did not return exactly one row. The bookmark tree is
    /// not a forest rooted at id 0.
    #[error("moz_bookmarks id {id} matched {rows} rows (expected exactly 1)")]
    Integrity { id: i64, rows: usize },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps a statement failure, keeping the SQL text for diagnosis.
    pub(crate) fn query(statement: &str, source: rusqlite::Error) -> Self {
        Error::Query {
            statement: statement.trim().to_string(),
            source,
        }
    }
}

/// True for the SQLite result codes Firefox produces while it is running.
pub(crate) fn is_locked(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}
