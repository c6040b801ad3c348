use crate::model::{ASOF_FORMAT, Bookmark, RunContext};
use crate::options::{ExportOptions, Source};
use crate::places;
use crate::render;
use crate::store::{self, HostEntry, InsertOutcome};
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

pub const LOCKED_MESSAGE: &str = "ERROR: Database is locked. Please close Firefox and try again.";

/// How a run ended when nothing went wrong along the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Done,
    /// `--output-sqlite` already held this host's bookmarks.
    HostRejected,
}

/// The main entry point for the business logic.
/// Reads from Firefox or an aggregation database, then writes either the
/// export files or the aggregation database.
pub fn execute(opts: &ExportOptions, ctx: &RunContext) -> Result<RunOutcome> {
    let outcome = match &opts.source {
        Source::Store(in_db) => {
            if opts.out_db.is_some() {
                tracing::warn!("--output-sqlite is ignored together with --from-sqlite");
            }
            say(opts, format!("Reading {}", in_db.display()));
            let conn = store::open_store_read_only(in_db)
                .wrap_err_with(|| format!("Failed to open {}", in_db.display()))?;
            let (n_hosts, bookmarks) = store::retrieve_all(&conn)?;
            drop(conn);
            tracing::info!(n_hosts, count = bookmarks.len(), "loaded aggregation database");
            write_outputs(opts, ctx, n_hosts, &bookmarks)?;
            RunOutcome::Done
        }
        Source::Places(places_file) => {
            say(opts, format!("Reading {}", places_file.display()));
            let asof = opts.asof.format(ASOF_FORMAT).to_string();
            let bookmarks = read_places(places_file, &opts.host_name, &asof, opts.quiet)?;

            match &opts.out_db {
                Some(out_db) => load_store(opts, ctx, places_file, out_db, &bookmarks)?,
                None => {
                    write_outputs(opts, ctx, 1, &bookmarks)?;
                    RunOutcome::Done
                }
            }
        }
    };

    if outcome == RunOutcome::Done {
        say(opts, "\nDone.\n".to_string());
    }
    Ok(outcome)
}

/// Map a finished run to the process exit status. A locked source is
/// reported here and becomes a plain failure; any other error is passed on.
pub fn exit_code(result: Result<RunOutcome>) -> Result<ExitCode> {
    match result {
        Ok(RunOutcome::Done) => Ok(ExitCode::SUCCESS),
        Ok(RunOutcome::HostRejected) => Ok(ExitCode::FAILURE),
        Err(report) => match report.downcast_ref::<crate::Error>() {
            Some(crate::Error::SourceLocked { .. }) => {
                eprintln!("\n{LOCKED_MESSAGE}\n");
                Ok(ExitCode::FAILURE)
            }
            _ => Err(report),
        },
    }
}

fn say(opts: &ExportOptions, msg: String) {
    if !opts.quiet {
        println!("{msg}");
    }
}

fn read_places(path: &Path, host_name: &str, asof: &str, quiet: bool) -> Result<Vec<Bookmark>> {
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let s = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            s.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        s.set_message("Reading bookmarks...");
        s.enable_steady_tick(Duration::from_millis(80));
        s
    };

    // The connection is dropped before returning, on the error path too.
    let result = places::open_places(path)
        .and_then(|conn| places::extract_bookmarks(&conn, host_name, asof));

    spinner.finish_and_clear();
    Ok(result?)
}

fn load_store(
    opts: &ExportOptions,
    ctx: &RunContext,
    places_file: &Path,
    out_db: &Path,
    bookmarks: &[Bookmark],
) -> Result<RunOutcome> {
    say(opts, format!("Writing database '{}'", out_db.display()));
    ensure_parent_dir(out_db)?;

    let mut conn = store::open_store(out_db)
        .wrap_err_with(|| format!("Failed to open {}", out_db.display()))?;
    store::ensure_schema(&conn)?;

    let host = HostEntry::new(&opts.host_name, places_file, ctx);
    match store::insert_bookmarks(&mut conn, &host, bookmarks)? {
        InsertOutcome::Inserted { host_id, count } => {
            tracing::info!(host_id, count, host = %opts.host_name, "stored bookmarks");
            let hosts: Vec<String> = store::list_hosts(&conn)?
                .into_iter()
                .map(|(_, h)| h.host_name)
                .collect();
            tracing::info!("hosts in database: {}", hosts.join(", "));
            Ok(RunOutcome::Done)
        }
        InsertOutcome::Rejected => {
            println!(
                "\nData for host '{}' is already in the database.",
                opts.host_name
            );
            println!("Duplicate data from same host is not allowed.\n");
            Ok(RunOutcome::HostRejected)
        }
    }
}

fn write_outputs(
    opts: &ExportOptions,
    ctx: &RunContext,
    n_hosts: usize,
    bookmarks: &[Bookmark],
) -> Result<()> {
    write_file(opts, &opts.output_file, |w| {
        render::write_bookmarks_html(w, bookmarks, ctx)
    })?;
    if let Some(path) = &opts.md_file {
        write_file(opts, path, |w| {
            render::write_bookmarks_markdown(w, bookmarks, ctx)
        })?;
    }
    if let Some(path) = &opts.bydate_file {
        write_file(opts, path, |w| {
            render::write_bookmarks_by_date_html(w, n_hosts, bookmarks, ctx)
        })?;
    }
    if let Some(path) = &opts.md_bydate {
        write_file(opts, path, |w| {
            render::write_bookmarks_markdown_by_date(w, n_hosts, bookmarks, ctx)
        })?;
    }
    Ok(())
}

fn write_file<F>(opts: &ExportOptions, path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    say(opts, format!("Writing '{}'", path.display()));
    ensure_parent_dir(path)?;

    let file =
        File::create(path).wrap_err_with(|| format!("Failed to create: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    body(&mut writer).wrap_err_with(|| format!("Failed to write: {}", path.display()))?;
    writer
        .flush()
        .wrap_err_with(|| format!("Failed to flush: {}", path.display()))?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("Failed to create output folder: {}", dir.display()))?;
    }
    Ok(())
}
