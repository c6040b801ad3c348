#![allow(dead_code)]

use chrono::{Duration, Local, NaiveDate, TimeZone};
use firefox_bookmarks_export::RunContext;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Microseconds for local `2023-01-02 03:04:05` shifted by `days`.
pub fn moz_date(days: i64) -> i64 {
    let naive = NaiveDate::from_ymd_opt(2023, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap()
        + Duration::days(days);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap()
        .timestamp_micros()
}

pub fn run_context() -> RunContext {
    RunContext::at(Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap())
}

/// A `places.sqlite` with only the columns the exporter reads, shaped like a
/// real profile: an unnamed root (id 1) with `menu` below it.
///
/// ```text
/// (root)
/// └── menu
///     ├── folder-1      Example Home Page, javascript: bookmarklet
///     ├── folder-2      Example Page 1
///     │   └── folder-2a Example Page 2
///     ├── place: query
///     └── untitled https bookmark
/// ```
pub fn make_fake_places_file(path: &Path) {
    assert!(!path.exists(), "Should be a new file.");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE moz_places (id INTEGER, url TEXT);
         CREATE TABLE moz_bookmarks (id INTEGER, fk INTEGER, title TEXT, parent INTEGER, dateAdded INTEGER);",
    )
    .unwrap();

    let places = [
        (1, "http://www.example.com/"),
        (2, "http://www.example.com/page1"),
        (3, "https://www.example.com/page2"),
        (4, "place:parent=menu________&sort=12"),
        (5, "javascript:alert('hi')"),
        (6, "https://untitled.example/?a=1&b=2"),
    ];
    for (id, url) in places {
        conn.execute("INSERT INTO moz_places VALUES (?1, ?2)", params![id, url])
            .unwrap();
    }

    let nodes: [(i64, Option<i64>, Option<&str>, i64, i64); 11] = [
        (1, None, Some(""), 0, moz_date(0)),
        (2, None, Some("menu"), 1, moz_date(0)),
        (3, None, Some("folder-1"), 2, moz_date(0)),
        (4, None, Some("folder-2"), 2, moz_date(0)),
        (5, None, Some("folder-2a"), 4, moz_date(0)),
        (6, Some(1), Some("Example Home Page"), 3, moz_date(0)),
        (7, Some(2), Some("Example Page 1"), 4, moz_date(4)),
        (8, Some(3), Some("Example Page 2"), 5, moz_date(2)),
        (9, Some(4), Some("Recently Bookmarked"), 2, moz_date(1)),
        (10, Some(5), Some("Say hi"), 3, moz_date(1)),
        (11, Some(6), None, 2, moz_date(-1)),
    ];
    for (id, fk, title, parent, added) in nodes {
        conn.execute(
            "INSERT INTO moz_bookmarks VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, fk, title, parent, added],
        )
        .unwrap();
    }
}

/// `(tmp, places_file, out_dir)`; keep `tmp` alive for the test's duration.
pub fn setup_tmp_source_and_output() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let src_file = tmp.path().join("profile").join("places.sqlite");
    let out_dir = tmp.path().join("output");
    std::fs::create_dir_all(&out_dir).unwrap();
    make_fake_places_file(&src_file);
    (tmp, src_file, out_dir)
}
