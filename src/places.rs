/// Reader for Firefox's `places.sqlite`.
///
/// Only two tables are touched, and only the columns below:
/// ```sql
/// CREATE TABLE moz_places (
///     id   INTEGER PRIMARY KEY,
///     url  LONGVARCHAR,
///     ...
/// );
/// CREATE TABLE moz_bookmarks (
///     id        INTEGER PRIMARY KEY,
///     type      INTEGER,
///     fk        INTEGER DEFAULT NULL,  -- moz_places.id, NULL for folders
///     parent    INTEGER,               -- moz_bookmarks.id, 0 for the root
///     title     LONGVARCHAR,
///     dateAdded INTEGER,               -- microseconds since the Unix epoch
///     ...
/// );
/// ```
///
/// Folders form a forest of parent pointers rooted at id 0. On a real profile
/// the single row under 0 is the unnamed `root________`, with `menu`,
/// `toolbar`, `unfiled` and `mobile` below it.
///
/// The connection is opened read-only and every read runs inside a
/// transaction that is rolled back. Nothing is ever written to the browser's
/// database.
use crate::error::{self, Error, Result};
use crate::model::{Bookmark, WHEN_ADDED_FORMAT};
use chrono::{DateTime, Local};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hops allowed when walking up the folder tree before the chain is treated
/// as a cycle.
pub const MAX_FOLDER_DEPTH: usize = 99;

/// Marker prepended to a folder path whose walk hit [`MAX_FOLDER_DEPTH`].
pub const DEPTH_ERROR_MARKER: &str = "/(ERROR)";

const BUSY_TIMEOUT: Duration = Duration::from_secs(1);

const BOOKMARKS_QUERY: &str = "
    SELECT
        b.title,
        p.url,
        b.parent,
        b.dateAdded
    FROM
        moz_bookmarks b
    JOIN moz_places p
    ON p.id = b.fk
";

const PARENT_QUERY: &str = "SELECT parent, title FROM moz_bookmarks WHERE id = ?1";

/// Open `places.sqlite` read-only with a short busy timeout, so a running
/// Firefox shows up as [`Error::SourceLocked`] instead of a hang.
pub fn open_places(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| source_error(path, "open", e))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Walk from `folder_id` up to the root and build the folder path.
///
/// The row whose parent is 0 (the root) contributes no segment. A lookup that
/// does not return exactly one row is an integrity error. A chain longer than
/// [`MAX_FOLDER_DEPTH`] is cut short and marked with [`DEPTH_ERROR_MARKER`]
/// so one bad record does not stop the export.
pub fn resolve_parent_path(conn: &Connection, folder_id: i64) -> Result<String> {
    let mut stmt = conn
        .prepare_cached(PARENT_QUERY)
        .map_err(|e| read_error(conn, PARENT_QUERY, e))?;

    let mut path = String::from("/");
    let mut current = folder_id;
    let mut depth = 0usize;

    while current > 0 {
        depth += 1;
        if depth > MAX_FOLDER_DEPTH {
            tracing::error!(folder_id, "parent path max depth exceeded");
            return Ok(format!("{DEPTH_ERROR_MARKER}{path}"));
        }

        let rows: Vec<(Option<i64>, Option<String>)> = stmt
            .query_map([current], |row| Ok((row.get(0)?, row.get(1)?)))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| read_error(conn, PARENT_QUERY, e))?;

        let [(parent, title)] = rows.as_slice() else {
            return Err(Error::Integrity {
                id: current,
                rows: rows.len(),
            });
        };

        current = parent.unwrap_or(0);
        if current > 0 {
            path = format!("/{}{}", title.as_deref().unwrap_or_default(), path);
        }
    }

    Ok(path)
}

/// Convert a Mozilla timestamp (microseconds since the Unix epoch) to local
/// time with second precision.
pub fn from_moz_date(micros: i64) -> String {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.with_timezone(&Local).format(WHEN_ADDED_FORMAT).to_string())
        .unwrap_or_default()
}

/// True when `url` is something a browser tab can open: `http` or `https`.
/// `place:` queries, `javascript:` bookmarklets and the like are not.
///
/// Only the raw scheme prefix is checked, case-sensitively, so every kept
/// record starts with `http://` or `https://` exactly as stored.
pub fn is_web_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Read every HTTP(S) bookmark, tagged with `host_name` and `asof`.
///
/// Order is whatever SQLite returns; the renderers sort for themselves.
pub fn extract_bookmarks(conn: &Connection, host_name: &str, asof: &str) -> Result<Vec<Bookmark>> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| read_error(conn, "BEGIN", e))?;

    let rows = read_bookmark_rows(&tx)?;

    let mut bookmarks = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for row in rows {
        if !is_web_url(&row.url) {
            tracing::info!("SKIP NON-HTTP URL: '{}'", row.url);
            skipped += 1;
            continue;
        }

        let parent_path = resolve_parent_path(&tx, row.parent)?;
        let title = match row.title {
            Some(t) if !t.is_empty() => t,
            _ => format!("({})", row.url),
        };

        bookmarks.push(Bookmark {
            title,
            url: row.url,
            parent_path,
            when_added: from_moz_date(row.date_added),
            host_name: host_name.to_string(),
            asof: asof.to_string(),
        });
    }

    tx.rollback().map_err(|e| read_error(conn, "ROLLBACK", e))?;

    tracing::info!(
        kept = bookmarks.len(),
        skipped,
        "read bookmarks from places database"
    );
    Ok(bookmarks)
}

struct BookmarkRow {
    title: Option<String>,
    url: String,
    parent: i64,
    date_added: i64,
}

fn read_bookmark_rows(conn: &Connection) -> Result<Vec<BookmarkRow>> {
    let mut stmt = conn
        .prepare(BOOKMARKS_QUERY)
        .map_err(|e| read_error(conn, BOOKMARKS_QUERY, e))?;

    let rows = stmt
        .query_map([], |row| {
            // dateAdded is declared INTEGER but hand-made copies sometimes
            // hold REAL values.
            let date_added: Option<f64> = row.get(3)?;
            Ok(BookmarkRow {
                title: row.get(0)?,
                url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                parent: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                date_added: date_added.unwrap_or(0.0) as i64,
            })
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| read_error(conn, BOOKMARKS_QUERY, e))?;
    Ok(rows)
}

fn read_error(conn: &Connection, statement: &str, err: rusqlite::Error) -> Error {
    let path = conn.path().map(PathBuf::from).unwrap_or_default();
    source_error(&path, statement, err)
}

fn source_error(path: &Path, statement: &str, err: rusqlite::Error) -> Error {
    if error::is_locked(&err) {
        Error::SourceLocked {
            path: path.to_path_buf(),
        }
    } else {
        Error::query(statement, err)
    }
}
