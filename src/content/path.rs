//! Output path patterns.
//!
//! Patterns are plain paths with `{name}` or `{name:arg}` placeholders:
//!
//! | Placeholder      | Value                                          |
//! |------------------|------------------------------------------------|
//! | `{slug}`         | entity slug                                    |
//! | `{filename}`     | source file stem (bundle: directory name)      |
//! | `{section}`      | section directory path, `posts/linux`          |
//! | `{section:slug}` | slugified section path                         |
//! | `{date:%Y}`      | page date, any chrono format after `date:`     |
//! | `{taxonomy}`     | taxonomy name                                  |
//! | `{term}`         | full term path, `linux/emacs`                  |
//! | `{term:slug}`    | slugified term path                            |
//! | `{number}`       | pager number, empty on the first pager         |
//! | `{number:one}`   | pager number, `1` on the first pager           |
//!
//! Unknown placeholders are kept verbatim. After substitution empty segments
//! collapse, so `{section}/{number}/index.html` on the root's first pager is
//! just `index.html`.

use chrono::NaiveDateTime;
use regex::{Captures, Regex};
use std::{fmt::Write, sync::LazyLock};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z]+)(?::([^}]*))?\}").unwrap());

/// Values available to a pattern. `None` expands to an empty string.
#[derive(Debug, Default, Clone, Copy)]
pub struct Vars<'a> {
    pub slug: Option<&'a str>,
    pub filename: Option<&'a str>,
    pub section: Option<&'a str>,
    pub section_slug: Option<&'a str>,
    pub date: Option<NaiveDateTime>,
    pub taxonomy: Option<&'a str>,
    pub term: Option<&'a str>,
    pub term_slug: Option<&'a str>,
    pub number: Option<usize>,
}

/// Substitute placeholders and normalize the result.
pub fn expand(pattern: &str, vars: &Vars) -> String {
    let expanded = PLACEHOLDER.replace_all(pattern, |caps: &Captures| {
        let text = |value: Option<&str>| value.unwrap_or_default().to_owned();
        match (&caps[1], caps.get(2).map(|m| m.as_str())) {
            ("slug", None) => text(vars.slug),
            ("filename", None) => text(vars.filename),
            ("section", None) => text(vars.section),
            ("section", Some("slug")) => text(vars.section_slug),
            ("date", Some(fmt)) => vars.date.map(|d| format_date(d, fmt)).unwrap_or_default(),
            ("taxonomy", None) => text(vars.taxonomy),
            ("term", None) => text(vars.term),
            ("term", Some("slug")) => text(vars.term_slug),
            ("number", None) => match vars.number {
                Some(n) if n > 1 => n.to_string(),
                _ => String::new(),
            },
            ("number", Some("one")) => vars.number.unwrap_or(1).to_string(),
            _ => caps[0].to_owned(),
        }
    });
    normalize(&expanded)
}

/// Format a date with a chrono pattern. An invalid pattern yields an empty string.
pub fn format_date(date: NaiveDateTime, fmt: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(fmt)).is_err() {
        out.clear();
    }
    out
}

/// Collapse empty and `.` segments and strip leading/trailing slashes.
pub fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a normalized path climbs out of its root through a `..` segment.
pub fn escapes_root(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

/// Join a base url and an output path. A trailing `index.html` is cut so the
/// permalink names the directory.
pub fn permalink(base: &str, path: &str) -> String {
    let path = normalize(path);
    let path = match path.strip_suffix("index.html") {
        Some(dir) if dir.is_empty() || dir.ends_with('/') => dir,
        _ => path.as_str(),
    };
    let encoded = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{encoded}", base.trim_end_matches('/'))
}
