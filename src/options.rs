use crate::model::RunContext;
use chrono::{DateTime, Local};
use clap::Parser;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const PLACES_FILE_NAME: &str = "places.sqlite";

/// Export Firefox bookmarks to a single HTML file, optionally with Markdown
/// and by-date companions, or collect them from several machines in a SQLite
/// database.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the Firefox profile folder. Searched recursively for the most
    /// recently modified 'places.sqlite'.
    #[arg(long, value_name = "DIR")]
    pub profile: Option<PathBuf>,

    /// Path to a specific 'places.sqlite' file. Overrides --profile.
    #[arg(long, value_name = "FILE")]
    pub places_file: Option<PathBuf>,

    /// Use the modified time of the 'places.sqlite' file for the 'as of'
    /// date-time listed in the output files.
    #[arg(long = "asof-mtime")]
    pub use_mtime: bool,

    /// Name of the output HTML file. The suffix is always '.html'.
    #[arg(long = "output-name", value_name = "NAME")]
    pub output_name: Option<PathBuf>,

    /// Folder in which to create the output files. Defaults to the Desktop.
    #[arg(long, value_name = "DIR")]
    pub output_folder: Option<PathBuf>,

    /// Also produce '<name>-bydate.html' listing bookmarks by date added,
    /// most recent first.
    #[arg(long = "by-date")]
    pub by_date: bool,

    /// Also produce Markdown ('<name>.md', and '<name>-bydate.md' with
    /// --by-date, oldest first).
    #[arg(long = "md")]
    pub markdown: bool,

    /// SQLite database to produce instead of HTML files. Data is appended to
    /// an existing database, but only for a host not already in it.
    #[arg(long = "output-sqlite", value_name = "NAME")]
    pub output_sqlite: Option<PathBuf>,

    /// Host name to record instead of this machine's. Useful when reading a
    /// copy of 'places.sqlite' taken from another machine.
    #[arg(long, value_name = "NAME")]
    pub host_name: Option<String>,

    /// SQLite database previously written with --output-sqlite to render
    /// instead of reading Firefox's database.
    #[arg(long = "from-sqlite", value_name = "FILE")]
    pub from_sqlite: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/firefox-bookmarks-export/config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Optional settings read from `config.toml`. Command line flags win.
#[derive(Deserialize, Default, Debug)]
pub struct FileConfig {
    pub profile: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub host_name: Option<String>,
    pub by_date: Option<bool>,
    pub markdown: Option<bool>,
}

pub fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("firefox-bookmarks-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

/// Where the bookmarks come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Places(PathBuf),
    Store(PathBuf),
}

/// Everything a run needs, with every default already applied.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub source: Source,
    pub output_file: PathBuf,
    pub bydate_file: Option<PathBuf>,
    pub md_file: Option<PathBuf>,
    pub md_bydate: Option<PathBuf>,
    pub out_db: Option<PathBuf>,
    pub host_name: String,
    /// Snapshot time: the run time, or the source file's mtime with
    /// `--asof-mtime`.
    pub asof: DateTime<Local>,
    pub quiet: bool,
}

impl ExportOptions {
    /// Resolve CLI flags over config-file values over built-in defaults.
    pub fn resolve(cli: Cli, file_cfg: FileConfig, ctx: &RunContext) -> Result<Self> {
        let source = match cli.from_sqlite {
            Some(in_db) => {
                if !in_db.exists() {
                    return Err(eyre!("Cannot find '{}'", in_db.display()));
                }
                Source::Store(in_db)
            }
            None => Source::Places(find_places_file(
                cli.places_file,
                cli.profile.or(file_cfg.profile),
            )?),
        };

        let asof = if cli.use_mtime {
            let path = match &source {
                Source::Places(p) | Source::Store(p) => p,
            };
            modified_time(path)?
        } else {
            ctx.run_at
        };

        let out_dir = cli
            .output_folder
            .or(file_cfg.output_folder)
            .map(|p| expand_home(&p))
            .unwrap_or_else(default_output_dir);

        let host_name = match cli.host_name.or(file_cfg.host_name) {
            Some(h) => h,
            None => machine_host_name()?,
        };

        let out_db = cli.output_sqlite.map(|p| {
            let file = with_suffix(&p, "sqlite");
            match p.parent() {
                Some(parent) if p.is_absolute() => parent.join(file),
                _ => out_dir.join(file),
            }
        });

        let output_name = match cli.output_name {
            Some(name) => with_suffix(&name, "html"),
            None => format!(
                "Firefox-bookmarks-{}-{}.html",
                host_name,
                asof.format("%y%m%d_%H%M")
            ),
        };
        let output_file = out_dir.join(output_name);
        let stem = output_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let by_date = cli.by_date || file_cfg.by_date.unwrap_or(false);
        let markdown = cli.markdown || file_cfg.markdown.unwrap_or(false);

        let bydate_file = by_date.then(|| out_dir.join(format!("{stem}-bydate.html")));
        let md_file = markdown.then(|| out_dir.join(format!("{stem}.md")));
        let md_bydate =
            (markdown && by_date).then(|| out_dir.join(format!("{stem}-bydate.md")));

        Ok(Self {
            source,
            output_file,
            bydate_file,
            md_file,
            md_bydate,
            out_db,
            host_name,
            asof,
            quiet: cli.quiet,
        })
    }
}

/// Firefox's profile root on this platform.
pub fn default_profile_root() -> PathBuf {
    if let Some(appdata) = std::env::var_os("APPDATA") {
        return PathBuf::from(appdata)
            .join("Mozilla")
            .join("Firefox")
            .join("Profiles");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mozilla")
        .join("firefox")
}

fn default_output_dir() -> PathBuf {
    dirs::desktop_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Desktop")
    })
}

fn find_places_file(explicit: Option<PathBuf>, profile: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(file) = explicit {
        if !file.exists() {
            return Err(eyre!("Cannot find file '{}'", file.display()));
        }
        return Ok(file);
    }

    let root = profile
        .map(|p| expand_home(&p))
        .unwrap_or_else(default_profile_root);
    if !root.exists() {
        return Err(eyre!("Cannot find folder '{}'", root.display()));
    }

    newest_places_file(&root)?.ok_or_else(|| {
        eyre!(
            "No '{}' found under '{}'.\nUse --places-file to specify the file manually.",
            PLACES_FILE_NAME,
            root.display()
        )
    })
}

/// The most recently modified `places.sqlite` anywhere below `root`.
pub fn newest_places_file(root: &Path) -> Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            tracing::debug!(dir = %dir.display(), "skipping unreadable folder");
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if meta.is_dir() {
                pending.push(path);
            } else if entry.file_name() == PLACES_FILE_NAME {
                let mtime = meta
                    .modified()
                    .wrap_err_with(|| format!("Failed to read mtime: {}", path.display()))?;
                tracing::debug!(file = %path.display(), "found places database");
                if newest.as_ref().is_none_or(|(t, _)| mtime >= *t) {
                    newest = Some((mtime, path));
                }
            }
        }
    }

    Ok(newest.map(|(_, p)| p))
}

fn modified_time(path: &Path) -> Result<DateTime<Local>> {
    let mtime = fs::metadata(path)
        .and_then(|m| m.modified())
        .wrap_err_with(|| format!("Failed to read modified time: {}", path.display()))?;
    Ok(DateTime::<Local>::from(mtime))
}

fn machine_host_name() -> Result<String> {
    let name = hostname::get().wrap_err("Failed to read this machine's host name")?;
    Ok(name.to_string_lossy().into_owned())
}

/// `dir/name.txt` -> `name.<suffix>`; only the stem of the given name is kept.
fn with_suffix(name: &Path, suffix: &str) -> String {
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.{suffix}")
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
