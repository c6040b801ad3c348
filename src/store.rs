//! Aggregation database: bookmarks from several machines in one SQLite file.
//!
//! The table and view layout is shared with every other copy of the tool that
//! may read or extend the same file, so the column sets must stay exactly as
//! they are below.
//!
//! Each host is loaded at most once. A second load under the same host name is
//! rejected and leaves the file untouched.
use crate::error::{Error, Result};
use crate::model::{APP_NAME, APP_VERSION, Bookmark, RunContext, WHEN_ADDED_FORMAT};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::Path;

const CREATE_HOSTS: &str = "
    CREATE TABLE hosts (
        id INTEGER PRIMARY KEY,
        host_name TEXT UNIQUE,
        source TEXT,
        created TEXT,
        app_name TEXT,
        app_version TEXT
    )
";

const CREATE_BOOKMARKS: &str = "
    CREATE TABLE bookmarks (
        id INTEGER PRIMARY KEY,
        host_id INTEGER,
        title TEXT,
        url TEXT,
        parent_path TEXT,
        when_added TEXT
    )
";

const CREATE_VIEW: &str = "
    CREATE VIEW view_bookmarks AS
        SELECT
            b.id,
            b.title,
            b.url,
            b.parent_path,
            b.when_added,
            b.host_id,
            h.host_name,
            h.created,
            h.source
        FROM bookmarks b
        JOIN hosts h
        ON h.id = b.host_id
";

const OBJECT_EXISTS: &str = "SELECT name FROM sqlite_master WHERE type = ?1 AND name = ?2";

const HOST_EXISTS: &str = "SELECT host_name FROM hosts WHERE host_name = ?1";

const INSERT_HOST: &str = "
    INSERT INTO hosts (host_name, source, created, app_name, app_version)
    VALUES (?1, ?2, ?3, ?4, ?5)
";

const INSERT_BOOKMARK: &str = "
    INSERT INTO bookmarks (host_id, title, url, parent_path, when_added)
    VALUES (?1, ?2, ?3, ?4, ?5)
";

const COUNT_HOSTS: &str = "SELECT count(id) FROM hosts";

const SELECT_BOOKMARKS: &str = "
    SELECT title, url, parent_path, when_added, host_name, created
    FROM view_bookmarks
    ORDER BY parent_path, title
";

const SELECT_HOSTS: &str = "
    SELECT id, host_name, source, created, app_name, app_version
    FROM hosts
    ORDER BY id
";

/// A row of the `hosts` table, minus its generated id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub host_name: String,
    /// Path of the `places.sqlite` the bookmarks were read from.
    pub source: String,
    pub created: String,
    pub app_name: String,
    pub app_version: String,
}

impl HostEntry {
    /// Host row stamped with this run's time and this build's name/version.
    pub fn new(host_name: &str, source: &Path, ctx: &RunContext) -> Self {
        Self {
            host_name: host_name.to_string(),
            source: source.display().to_string(),
            created: ctx.run_at.format(WHEN_ADDED_FORMAT).to_string(),
            app_name: APP_NAME.to_string(),
            app_version: APP_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { host_id: i64, count: usize },
    /// The host name was already present; nothing was written.
    Rejected,
}

/// Open an aggregation database, creating the file if needed.
pub fn open_store(path: &Path) -> Result<Connection> {
    Ok(Connection::open(path)?)
}

/// Open an existing aggregation database for reading only.
pub fn open_store_read_only(path: &Path) -> Result<Connection> {
    Ok(Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}

fn object_exists(conn: &Connection, kind: &str, name: &str) -> Result<bool> {
    conn.query_row(OBJECT_EXISTS, [kind, name], |_| Ok(()))
        .optional()
        .map(|row| row.is_some())
        .map_err(|e| Error::query(OBJECT_EXISTS, e))
}

/// Create `hosts`, `bookmarks` and `view_bookmarks` if they are missing.
/// Existing objects are left alone.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    let objects = [
        ("table", "hosts", "Table", CREATE_HOSTS),
        ("table", "bookmarks", "Table", CREATE_BOOKMARKS),
        ("view", "view_bookmarks", "View", CREATE_VIEW),
    ];

    for (kind, name, label, ddl) in objects {
        if object_exists(conn, kind, name)? {
            tracing::info!("{label} '{name}' exists.");
        } else {
            tracing::info!("Creating {} '{name}'.", kind);
            conn.execute_batch(ddl).map_err(|e| Error::query(ddl, e))?;
        }
    }
    Ok(())
}

/// Store one host's bookmarks, unless that host is already in the database.
///
/// The host row is committed first so its id is durable before any bookmark
/// row refers to it; the bookmark rows then go in as a second transaction.
pub fn insert_bookmarks(
    conn: &mut Connection,
    host: &HostEntry,
    bookmarks: &[Bookmark],
) -> Result<InsertOutcome> {
    let existing: Option<String> = conn
        .query_row(HOST_EXISTS, [&host.host_name], |row| row.get(0))
        .optional()
        .map_err(|e| Error::query(HOST_EXISTS, e))?;
    if existing.is_some() {
        tracing::warn!(host = %host.host_name, "host already loaded, rejecting");
        return Ok(InsertOutcome::Rejected);
    }

    let tx = conn.transaction()?;
    tx.execute(
        INSERT_HOST,
        params![
            host.host_name,
            host.source,
            host.created,
            host.app_name,
            host.app_version
        ],
    )
    .map_err(|e| Error::query(INSERT_HOST, e))?;
    let host_id = tx.last_insert_rowid();
    tx.commit()?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx
            .prepare(INSERT_BOOKMARK)
            .map_err(|e| Error::query(INSERT_BOOKMARK, e))?;
        for bmk in bookmarks {
            stmt.execute(params![
                host_id,
                bmk.title,
                bmk.url,
                bmk.parent_path,
                bmk.when_added
            ])
            .map_err(|e| Error::query(INSERT_BOOKMARK, e))?;
        }
    }
    tx.commit()?;

    tracing::debug!(host_id, count = bookmarks.len(), "stored bookmarks");
    Ok(InsertOutcome::Inserted {
        host_id,
        count: bookmarks.len(),
    })
}

/// Number of hosts, and every stored bookmark ordered by folder then title.
pub fn retrieve_all(conn: &Connection) -> Result<(usize, Vec<Bookmark>)> {
    let n_hosts: i64 = conn
        .query_row(COUNT_HOSTS, [], |row| row.get(0))
        .map_err(|e| Error::query(COUNT_HOSTS, e))?;

    let mut stmt = conn
        .prepare(SELECT_BOOKMARKS)
        .map_err(|e| Error::query(SELECT_BOOKMARKS, e))?;
    let bookmarks = stmt
        .query_map([], |row| {
            Ok(Bookmark {
                title: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                parent_path: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                when_added: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                host_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                asof: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            })
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| Error::query(SELECT_BOOKMARKS, e))?;

    Ok((n_hosts.max(0) as usize, bookmarks))
}

/// Every host row with its id, oldest first.
pub fn list_hosts(conn: &Connection) -> Result<Vec<(i64, HostEntry)>> {
    let mut stmt = conn
        .prepare(SELECT_HOSTS)
        .map_err(|e| Error::query(SELECT_HOSTS, e))?;
    let hosts = stmt
        .query_map([], |row| {
            let text = |i: usize| -> rusqlite::Result<String> {
                Ok(row.get::<_, Option<String>>(i)?.unwrap_or_default())
            };
            Ok((
                row.get::<_, i64>(0)?,
                HostEntry {
                    host_name: text(1)?,
                    source: text(2)?,
                    created: text(3)?,
                    app_name: text(4)?,
                    app_version: text(5)?,
                },
            ))
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| Error::query(SELECT_HOSTS, e))?;
    Ok(hosts)
}
