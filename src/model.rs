use chrono::{DateTime, Local};

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `when_added` and the aggregation `created` column.
pub const WHEN_ADDED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// "as of" stamps and page footers.
pub const ASOF_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One exported bookmark.
///
/// `host_name` and `asof` describe the snapshot the bookmark came from, not the
/// bookmark itself. When read back from an aggregation database both come from
/// the joined `hosts` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    pub url: String,
    /// Folder path such as `/menu/Rust/`; `/` when the bookmark sits directly
    /// under a top-level folder.
    pub parent_path: String,
    pub when_added: String,
    pub host_name: String,
    pub asof: String,
}

/// Values fixed once at start-up and handed to whatever needs "now".
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_at: DateTime<Local>,
}

impl RunContext {
    pub fn now() -> Self {
        Self { run_at: Local::now() }
    }

    pub fn at(run_at: DateTime<Local>) -> Self {
        Self { run_at }
    }

    /// `firefox-bookmarks-export (v0.1.0)`
    pub fn app_title(&self) -> String {
        format!("{} (v{})", APP_NAME, APP_VERSION)
    }
}
