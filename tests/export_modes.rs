//! End-to-end runs through option resolution and `export::execute`, against
//! fake `places.sqlite` files in temporary folders.

mod common;

use chrono::{Local, TimeZone};
use clap::Parser;
use common::{make_fake_places_file, run_context, setup_tmp_source_and_output};
use firefox_bookmarks_export::export::{self, RunOutcome};
use firefox_bookmarks_export::options::{Cli, ExportOptions, FileConfig};
use firefox_bookmarks_export::places::{extract_bookmarks, open_places};
use firefox_bookmarks_export::{Error, store};
use rusqlite::Connection;
use std::fs::{self, File};
use std::path::Path;

fn run(args: &[&str]) -> eyre::Result<RunOutcome> {
    let cli = Cli::try_parse_from(
        ["firefox-bookmarks-export", "--quiet"]
            .into_iter()
            .chain(args.iter().copied()),
    )?;
    let ctx = run_context();
    let opts = ExportOptions::resolve(cli, FileConfig::default(), &ctx)?;
    export::execute(&opts, &ctx)
}

fn s(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn as_refs(v: &[String]) -> Vec<&str> {
    v.iter().map(String::as_str).collect()
}

#[test]
fn extractor_keeps_only_web_links() {
    let (_tmp, src, _out) = setup_tmp_source_and_output();
    let conn = open_places(&src).unwrap();
    let bmks = extract_bookmarks(&conn, "alpha", "2024-05-06 07:08").unwrap();

    assert_eq!(bmks.len(), 4);
    assert!(
        bmks.iter()
            .all(|b| b.url.starts_with("http://") || b.url.starts_with("https://"))
    );
    assert!(bmks.iter().all(|b| b.host_name == "alpha"));
    assert!(bmks.iter().all(|b| b.asof == "2024-05-06 07:08"));

    let by_title = |t: &str| bmks.iter().find(|b| b.title == t).unwrap();
    assert_eq!(by_title("Example Home Page").parent_path, "/menu/folder-1/");
    assert_eq!(by_title("Example Page 1").parent_path, "/menu/folder-2/");
    assert_eq!(
        by_title("Example Page 2").parent_path,
        "/menu/folder-2/folder-2a/"
    );
    assert_eq!(by_title("Example Home Page").when_added, "2023-01-02 03:04:05");
    assert_eq!(by_title("Example Page 1").when_added, "2023-01-06 03:04:05");

    let untitled = by_title("(https://untitled.example/?a=1&b=2)");
    assert_eq!(untitled.parent_path, "/menu/");
}

#[test]
fn extractor_leaves_source_untouched() {
    let (_tmp, src, _out) = setup_tmp_source_and_output();
    let before = fs::read(&src).unwrap();
    {
        let conn = open_places(&src).unwrap();
        extract_bookmarks(&conn, "alpha", "x").unwrap();
    }
    assert_eq!(fs::read(&src).unwrap(), before);
}

#[test]
fn html_markdown_and_by_date_files() {
    let (_tmp, src, out) = setup_tmp_source_and_output();
    let outcome = run(&[
        "--places-file",
        s(&src),
        "--output-folder",
        s(&out),
        "--output-name",
        "test-output.html",
        "--by-date",
        "--md",
        "--host-name",
        "alpha",
    ])
    .unwrap();
    assert_eq!(outcome, RunOutcome::Done);

    for name in [
        "test-output.html",
        "test-output-bydate.html",
        "test-output.md",
        "test-output-bydate.md",
    ] {
        assert!(out.join(name).exists(), "{name} missing");
    }

    let html = fs::read_to_string(out.join("test-output.html")).unwrap();
    assert!(html.contains("On host 'alpha' as of 2024-05-06 07:08"));
    assert!(!html.contains("javascript:"));
    assert!(!html.contains("place:"));
    assert!(html.contains("https://untitled.example/?a=1%26b=2"));

    // Added on days +4, +2, 0 and -1.
    let by_date = fs::read_to_string(out.join("test-output-bydate.html")).unwrap();
    let order: Vec<usize> = [
        "Example Page 1",
        "Example Page 2",
        "Example Home Page",
        "(https://untitled",
    ]
    .iter()
    .map(|t| by_date.find(t).unwrap())
    .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{order:?}");

    let md_by_date = fs::read_to_string(out.join("test-output-bydate.md")).unwrap();
    let order: Vec<usize> = [
        "[(https://untitled",
        "[Example Home Page]",
        "[Example Page 2]",
        "[Example Page 1]",
    ]
    .iter()
    .map(|t| md_by_date.find(t).unwrap())
    .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{order:?}");
}

#[test]
fn output_name_suffix_is_forced_to_html() {
    let (_tmp, src, out) = setup_tmp_source_and_output();
    run(&[
        "--places-file",
        s(&src),
        "--output-folder",
        s(&out),
        "--output-name",
        "test-output.md",
        "--host-name",
        "alpha",
    ])
    .unwrap();
    assert!(out.join("test-output.html").exists());
    assert!(!out.join("test-output.md").exists());
}

#[test]
fn aggregation_database_round_trip() {
    let (_tmp, src, out) = setup_tmp_source_and_output();
    let db_args = |host: &'static str| {
        vec![
            "--places-file".to_string(),
            s(&src).to_string(),
            "--output-folder".to_string(),
            s(&out).to_string(),
            "--output-sqlite=test-db-output.sqlite".to_string(),
            format!("--host-name={host}"),
        ]
    };

    let first = db_args("alpha");
    assert_eq!(run(&as_refs(&first)).unwrap(), RunOutcome::Done);

    let db_path = out.join("test-db-output.sqlite");
    let count = |p: &Path| -> i64 {
        Connection::open(p)
            .unwrap()
            .query_row("SELECT count(*) FROM bookmarks", [], |r| r.get(0))
            .unwrap()
    };
    assert_eq!(count(&db_path), 4);

    // Same host again: rejected, nothing written.
    assert_eq!(run(&as_refs(&first)).unwrap(), RunOutcome::HostRejected);
    assert_eq!(count(&db_path), 4);

    let second = db_args("other_host");
    assert_eq!(run(&as_refs(&second)).unwrap(), RunOutcome::Done);
    assert_eq!(count(&db_path), 8);

    let conn = store::open_store_read_only(&db_path).unwrap();
    let (n_hosts, stored) = store::retrieve_all(&conn).unwrap();
    assert_eq!(n_hosts, 2);
    let source = open_places(&src).unwrap();
    let mut extracted: Vec<_> = extract_bookmarks(&source, "alpha", "x")
        .unwrap()
        .into_iter()
        .map(|b| (b.title, b.url, b.parent_path, b.when_added, b.host_name))
        .collect();
    let mut alpha_rows: Vec<_> = stored
        .into_iter()
        .filter(|b| b.host_name == "alpha")
        .map(|b| (b.title, b.url, b.parent_path, b.when_added, b.host_name))
        .collect();
    extracted.sort();
    alpha_rows.sort();
    assert_eq!(extracted, alpha_rows);

    let outcome = run(&[
        "--output-folder",
        s(&out),
        "--from-sqlite",
        s(&db_path),
        "--output-name",
        "from-db.html",
        "--by-date",
        "--md",
    ])
    .unwrap();
    assert_eq!(outcome, RunOutcome::Done);

    let html = fs::read_to_string(out.join("from-db.html")).unwrap();
    assert!(html.contains("other_host"));
    assert!(html.contains("On host 'alpha' as of 2024-05-06 07:08:09"));

    let by_date = fs::read_to_string(out.join("from-db-bydate.html")).unwrap();
    assert!(by_date.contains("Combined bookmarks from multiple hosts."));
    assert!(by_date.contains("(other_host)"));

    let md_by_date = fs::read_to_string(out.join("from-db-bydate.md")).unwrap();
    assert!(md_by_date.contains("Host: `alpha`"));
}

#[test]
fn asof_mtime_drives_file_name_and_text() {
    let (_tmp, src, out) = setup_tmp_source_and_output();
    let stamp = Local.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
    File::options()
        .write(true)
        .open(&src)
        .unwrap()
        .set_modified(stamp.into())
        .unwrap();

    run(&[
        "--places-file",
        s(&src),
        "--output-folder",
        s(&out),
        "--asof-mtime",
        "--host-name",
        "alpha",
    ])
    .unwrap();

    let files: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "html"))
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.contains("230102_0304"), "{name}");
    let html = fs::read_to_string(&files[0]).unwrap();
    assert!(html.contains(" as of 2023-01-02 03:04"));
}

#[test]
fn profile_search_uses_newest_places_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let older = tmp.path().join("profileZ/places.sqlite");
    let newer = tmp.path().join("profileA/places.sqlite");
    make_fake_places_file(&older);
    make_fake_places_file(&newer);
    let now = std::time::SystemTime::now();
    File::options()
        .write(true)
        .open(&older)
        .unwrap()
        .set_modified(now - std::time::Duration::from_secs(600))
        .unwrap();

    let cli = Cli::try_parse_from([
        "firefox-bookmarks-export",
        "--profile",
        s(tmp.path()),
        "--host-name",
        "h",
    ])
    .unwrap();
    let opts = ExportOptions::resolve(cli, FileConfig::default(), &run_context()).unwrap();
    assert_eq!(
        opts.source,
        firefox_bookmarks_export::options::Source::Places(newer)
    );
}

#[test]
fn locked_source_is_reported_as_locked() {
    let (_tmp, src, out) = setup_tmp_source_and_output();

    let holder = Connection::open(&src).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let conn = open_places(&src).unwrap();
    let err = extract_bookmarks(&conn, "alpha", "x").unwrap_err();
    assert!(matches!(err, Error::SourceLocked { .. }), "{err:?}");
    drop(conn);

    let report = run(&[
        "--places-file",
        s(&src),
        "--output-folder",
        s(&out),
        "--host-name",
        "alpha",
    ])
    .unwrap_err();
    assert!(matches!(
        report.downcast_ref::<Error>(),
        Some(Error::SourceLocked { .. })
    ));

    holder.execute_batch("ROLLBACK;").unwrap();
}

#[test]
fn bookmark_under_cyclic_folders_is_kept_with_marker() {
    let (_tmp, src, _out) = setup_tmp_source_and_output();
    {
        let conn = Connection::open(&src).unwrap();
        conn.execute_batch(
            "INSERT INTO moz_places VALUES (20, 'https://loop.example/');
             INSERT INTO moz_bookmarks VALUES (30, NULL, 'loop-a', 31, 0);
             INSERT INTO moz_bookmarks VALUES (31, NULL, 'loop-b', 30, 0);
             INSERT INTO moz_bookmarks VALUES (32, 20, 'Looped', 30, 0);",
        )
        .unwrap();
    }

    let conn = open_places(&src).unwrap();
    let bmks = extract_bookmarks(&conn, "alpha", "x").unwrap();
    assert_eq!(bmks.len(), 5);

    let looped = bmks.iter().find(|b| b.title == "Looped").unwrap();
    assert!(looped.parent_path.starts_with("/(ERROR)/"), "{}", looped.parent_path);
    assert!(
        bmks.iter()
            .filter(|b| b.title != "Looped")
            .all(|b| b.parent_path.starts_with("/menu/"))
    );
}
