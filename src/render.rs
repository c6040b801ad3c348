//! HTML and Markdown writers.
//!
//! Every writer sorts its own copy of the bookmarks, so callers can pass the
//! same slice to all four.
use crate::model::{ASOF_FORMAT, Bookmark, RunContext};
use std::io::{self, Write};

const TITLE_LIMIT: usize = 180;
const ELLIPSIS: &str = "...";

const STYLE: &str = r#"
        body {
            background-color: oldlace;
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            padding: 1rem 4rem;
        }
        a:link, a:visited {
            color: #00248F;
            text-decoration: none;
        }
        :link:hover,:visited:hover {
            color: #B32400;
            text-decoration: underline;
        }
        .bookmark-path { color: gray; }
        .bookmark-title { color: black; }
        .added-dt {
            color: darkslateblue;
            font-size: 12px;
        }
        .asof {
            color: brown;
            font-size: 18px;
            font-weight: bold;
            margin-top: 2rem;
        }
        #footer {
            border-top: 1px solid black;
            font-size: x-small;
            margin-top: 2rem;
        }"#;

/// Cut titles longer than 180 characters to 177 plus `...`.
pub fn limit_title(title: &str) -> String {
    if title.chars().count() <= TITLE_LIMIT {
        return title.to_string();
    }
    let kept: String = title
        .chars()
        .take(TITLE_LIMIT - ELLIPSIS.len())
        .collect();
    kept + ELLIPSIS
}

/// Escape text for HTML. `&` goes first so the entities added for `<` and
/// `>` are not escaped again. The Markdown writers use this as-is; Markdown
/// syntax characters pass through untouched.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_url(url: &str) -> String {
    url.replace('&', "%26")
}

/// Host, then folder, then title, all case-insensitive.
fn sort_by_location(bmks: &mut [Bookmark]) {
    bmks.sort_by_cached_key(|b| b.title.to_lowercase());
    bmks.sort_by_cached_key(|b| b.parent_path.to_lowercase());
    bmks.sort_by_cached_key(|b| b.host_name.to_lowercase());
}

/// Date added, then URL, then host.
fn sort_by_date(bmks: &mut [Bookmark], newest_first: bool) {
    bmks.sort_by_cached_key(|b| b.host_name.to_lowercase());
    bmks.sort_by(|a, b| a.url.cmp(&b.url));
    if newest_first {
        bmks.sort_by(|a, b| b.when_added.cmp(&a.when_added));
    } else {
        bmks.sort_by(|a, b| a.when_added.cmp(&b.when_added));
    }
}

fn footer_text(ctx: &RunContext) -> String {
    format!(
        "Created {} by {}",
        ctx.run_at.format(ASOF_FORMAT),
        ctx.app_title()
    )
}

fn write_html_head<W: Write>(w: &mut W, title: &str, ctx: &RunContext) -> io::Result<()> {
    writeln!(w, "<!DOCTYPE html>")?;
    writeln!(w, "<html lang=\"en\">")?;
    writeln!(w, "<head>")?;
    writeln!(w, "    <meta name=\"generator\" content=\"{}\">", ctx.app_title())?;
    writeln!(
        w,
        "    <meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\">"
    )?;
    writeln!(w, "    <title>{title}</title>")?;
    writeln!(w, "    <style>{STYLE}")?;
    writeln!(w, "    </style>")?;
    writeln!(w, "    <base target=\"_blank\">")?;
    writeln!(w, "</head>")?;
    writeln!(w, "<body>")?;
    writeln!(w, "<h1>{title}</h1>")?;
    writeln!(w, "<ul>")
}

fn write_html_tail<W: Write>(w: &mut W, ctx: &RunContext) -> io::Result<()> {
    writeln!(w, "</ul>")?;
    writeln!(w, "<div id=\"footer\">")?;
    writeln!(w, "  {}.", footer_text(ctx))?;
    writeln!(w, "</div>")?;
    writeln!(w, "</body>")?;
    writeln!(w, "</html>")
}

fn write_html_item<W: Write>(w: &mut W, bmk: &Bookmark, host_suffix: &str) -> io::Result<()> {
    let url = escape_url(&bmk.url);
    writeln!(w)?;
    writeln!(w, "        <li>")?;
    writeln!(w, "            <p>")?;
    writeln!(
        w,
        "            <span class=\"bookmark-title\">{}</span><br />",
        escape_text(&limit_title(&bmk.title))
    )?;
    writeln!(
        w,
        "            <span class=\"bookmark-path\">{}</span><br />",
        escape_text(&bmk.parent_path)
    )?;
    writeln!(w, "            <a href=\"{url}\">{url}</a><br />")?;
    writeln!(
        w,
        "            <span class=\"added-dt\">Added {}{host_suffix}</span>",
        bmk.when_added
    )?;
    writeln!(w, "            </p>")?;
    writeln!(w, "        </li>")
}

fn write_markdown_item<W: Write>(w: &mut W, bmk: &Bookmark, host_line: &str) -> io::Result<()> {
    writeln!(
        w,
        "[{}]({})",
        escape_text(&limit_title(&bmk.title)),
        escape_url(&bmk.url)
    )?;
    writeln!(w, "Added: `{}`", bmk.when_added)?;
    writeln!(w, "Folder: `{}`", escape_text(&bmk.parent_path))?;
    write!(w, "{host_line}")?;
    writeln!(w)
}

/// HTML page grouped by host, then sorted by folder and title.
pub fn write_bookmarks_html<W: Write>(
    w: &mut W,
    bookmarks: &[Bookmark],
    ctx: &RunContext,
) -> io::Result<()> {
    let mut bmks = bookmarks.to_vec();
    sort_by_location(&mut bmks);

    write_html_head(w, "Bookmarks", ctx)?;

    let mut last_host = "";
    for bmk in &bmks {
        if bmk.host_name != last_host {
            writeln!(
                w,
                "<div class=\"asof\">On host '{}' as of {}</div>",
                escape_text(&bmk.host_name),
                bmk.asof
            )?;
            last_host = bmk.host_name.as_str();
        }
        write_html_item(w, bmk, "")?;
    }

    write_html_tail(w, ctx)
}

/// HTML page, most recently added first. With more than one host each entry
/// names the host it came from.
pub fn write_bookmarks_by_date_html<W: Write>(
    w: &mut W,
    n_hosts: usize,
    bookmarks: &[Bookmark],
    ctx: &RunContext,
) -> io::Result<()> {
    let mut bmks = bookmarks.to_vec();
    sort_by_date(&mut bmks, true);

    write_html_head(w, "Bookmarks by Date Added", ctx)?;

    if n_hosts > 1 {
        writeln!(w, "<div class=\"asof\">")?;
        writeln!(w, "Combined bookmarks from multiple hosts.")?;
        writeln!(w, "</div>")?;
    } else if let Some(first) = bmks.first() {
        writeln!(
            w,
            "<div class=\"asof\">On host {} as of {}</div>",
            escape_text(&first.host_name),
            first.asof
        )?;
    }

    for bmk in &bmks {
        let host_suffix = if n_hosts > 1 {
            format!("&nbsp;&nbsp;&nbsp;({})", escape_text(&bmk.host_name))
        } else {
            String::new()
        };
        write_html_item(w, bmk, &host_suffix)?;
    }

    write_html_tail(w, ctx)
}

/// Markdown counterpart of [`write_bookmarks_html`].
pub fn write_bookmarks_markdown<W: Write>(
    w: &mut W,
    bookmarks: &[Bookmark],
    ctx: &RunContext,
) -> io::Result<()> {
    let mut bmks = bookmarks.to_vec();
    sort_by_location(&mut bmks);

    writeln!(w, "# Bookmarks")?;
    writeln!(w)?;

    let mut last_host = "";
    for bmk in &bmks {
        if bmk.host_name != last_host {
            writeln!(w, "On host **{}** as of **{}**", bmk.host_name, bmk.asof)?;
            writeln!(w)?;
            last_host = bmk.host_name.as_str();
        }
        write_markdown_item(w, bmk, "")?;
    }

    write!(w, "---\n\n{}", footer_text(ctx))
}

/// Markdown list by date added, oldest first (reads top to bottom like a log).
pub fn write_bookmarks_markdown_by_date<W: Write>(
    w: &mut W,
    n_hosts: usize,
    bookmarks: &[Bookmark],
    ctx: &RunContext,
) -> io::Result<()> {
    let mut bmks = bookmarks.to_vec();
    sort_by_date(&mut bmks, false);

    writeln!(w, "# Bookmarks by Date Added")?;
    writeln!(w)?;

    if n_hosts > 1 {
        writeln!(w, "(Combined bookmarks from multiple hosts.)")?;
        writeln!(w)?;
    } else if let Some(first) = bmks.first() {
        writeln!(
            w,
            "On host **{}** as of **{}**.",
            first.host_name, first.asof
        )?;
        writeln!(w)?;
    }

    for bmk in &bmks {
        let host_line = if n_hosts > 1 {
            format!("Host: `{}`\n", bmk.host_name)
        } else {
            String::new()
        };
        write_markdown_item(w, bmk, &host_line)?;
    }

    write!(w, "---\n\n{}", footer_text(ctx))
}
