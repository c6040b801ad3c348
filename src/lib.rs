//! # firefox-bookmarks-export
//!
//! A CLI tool that exports [Firefox](https://www.mozilla.org/firefox/) bookmarks
//! to a single, self-contained HTML page, with optional Markdown and
//! "by date added" companions.
//!
//! ## What it does
//!
//! Firefox keeps bookmarks in its `places.sqlite` database as a tree of folder
//! rows (`moz_bookmarks`) pointing at URL rows (`moz_places`). This tool walks
//! that tree to recover each bookmark's folder path, drops everything that is
//! not an `http`/`https` link, and renders the rest.
//!
//! The database is opened **read-only**. If Firefox is running and holds the
//! lock, the tool says so and exits instead of waiting.
//!
//! ## Several machines
//!
//! With `--output-sqlite` the bookmarks go into a small SQLite database instead
//! of HTML. Running it again on another machine (or with `--host-name` on a
//! copied `places.sqlite`) appends that host's bookmarks; the same host is
//! never loaded twice. `--from-sqlite` then renders the combined set.
//!
//! ## Usage
//!
//! ```sh
//! # Newest profile under ~/.mozilla/firefox, written to the Desktop
//! firefox-bookmarks-export
//!
//! # Specific file, Markdown too, plus by-date listings
//! firefox-bookmarks-export --places-file ~/backup/places.sqlite --md --by-date
//!
//! # Merge two machines, then render the merged set
//! firefox-bookmarks-export --output-sqlite all-bookmarks
//! firefox-bookmarks-export --places-file laptop-places.sqlite --host-name laptop --output-sqlite all-bookmarks
//! firefox-bookmarks-export --from-sqlite ~/Desktop/all-bookmarks.sqlite --by-date
//! ```
//!
//! Preferences can be persisted in `~/.config/firefox-bookmarks-export/config.toml`.
pub mod error;
pub mod export;
pub mod model;
pub mod options;
pub mod places;
pub mod render;
pub mod store;

pub use error::{Error, Result};
pub use model::{Bookmark, RunContext};
