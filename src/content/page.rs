//! Pages and page assembly.
//!
//! A page starts as its section's metadata with the page-private keys removed,
//! overlaid by the file's own metadata. Everything else (language, dates,
//! slug, output path, permalink, formats, aliases) is derived from that merged
//! map plus the source file name.
//!
//! | Field       | Source, in order                                            |
//! |-------------|-------------------------------------------------------------|
//! | `lang`      | `lang` key → `name.<lang>.<ext>` → default language         |
//! | `date`      | `date` key → `YYYY-MM-DD-` name prefix → now                |
//! | `modified`  | `modified` key → `date`                                     |
//! | `title`     | `title` key → file name without date prefix                 |
//! | `slug`      | `slug` key → slugified title                                |
//! | `path`      | `url` / `save_as` / `path` key → `page_path` pattern        |

use super::{
    Format, PageId, SectionId, SiteInfo,
    path::{self, Vars},
};
use crate::{log, meta::Meta, utils};
use chrono::NaiveDateTime;
use serde_json::Value;

/// Default `page_path` pattern.
pub const DEFAULT_PAGE_PATH: &str = "{section}/{slug}.html";

/// Section keys a page never inherits.
const PRIVATE_KEYS: &[&str] = &[
    "title",
    "content",
    "summary",
    "slug",
    "path",
    "template",
    "formats",
    "aliases",
    "url",
    "save_as",
    "date",
    "modified",
    "paginate",
    "weight",
    "ignore_files",
    "lang",
];

/// Keys whose value is an explicit output path, in priority order.
const EXPLICIT_PATH_KEYS: &[&str] = &["url", "save_as", "path"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Listed in sections and taxonomies.
    Normal,
    /// Rendered, but never listed (`status = "hidden"`).
    Hidden,
    /// A standalone page owned by a section (`status = "section"`).
    SectionPage,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Hidden => "hidden",
            Self::SectionPage => "section",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    /// Source path relative to the content root, `/`-separated.
    pub id: String,
    pub lang: String,
    pub date: NaiveDateTime,
    pub modified: NaiveDateTime,
    pub title: String,
    pub slug: String,
    /// Output path relative to the output root.
    pub path: String,
    pub permalink: String,
    pub meta: Meta,
    pub content: String,
    pub summary: String,
    pub formats: Vec<Format>,
    pub aliases: Vec<String>,
    /// Bundle-local files, relative to the bundle directory.
    pub assets: Vec<String>,
    pub section: SectionId,
    pub kind: PageKind,
    pub prev: Option<PageId>,
    pub next: Option<PageId>,
    pub prev_in_section: Option<PageId>,
    pub next_in_section: Option<PageId>,
}

impl Page {
    pub fn template(&self) -> String {
        self.meta.get_str("template").unwrap_or_else(|| "page.html".into())
    }

    pub fn is_listed(&self) -> bool {
        self.kind == PageKind::Normal
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Where a page comes from and what it inherits.
#[derive(Debug, Clone)]
pub struct PageSource<'a> {
    /// Source path relative to the content root.
    pub id: &'a str,
    /// Name of the parsed file, e.g. `hello.zh.md` or a bundle's `index.md`.
    pub file_name: &'a str,
    /// Directory name when the page is a bundle.
    pub bundle: Option<&'a str>,
    pub section: SectionId,
    pub section_key: &'a str,
    pub section_slug: &'a str,
    pub section_meta: &'a Meta,
    pub assets: Vec<String>,
}

/// Build a page for `lang`. Returns `None` when the page belongs to another language.
pub fn assemble(source: PageSource, file_meta: &Meta, lang: &str, site: &SiteInfo) -> Option<Page> {
    let (stem, name_lang) = split_name(source.file_name, site);

    let mut meta = inherit(source.section_meta, PRIVATE_KEYS);
    meta.merge(file_meta);

    let page_lang = meta
        .get_str("lang")
        .or_else(|| name_lang.map(str::to_owned))
        .unwrap_or_else(|| site.default_lang.clone());
    if page_lang != lang {
        return None;
    }

    let filename = source.bundle.unwrap_or(stem);
    let (name_date, base) = utils::date::split_prefix(filename);

    let date = meta_date(&meta, "date", source.id)
        .or(name_date)
        .unwrap_or_else(utils::date::now);
    let modified = meta_date(&meta, "modified", source.id).unwrap_or(date);

    let title = meta.get_str("title").unwrap_or_else(|| base.to_owned());
    let slug = meta.get_str("slug").unwrap_or_else(|| {
        let slug = utils::slug::slugify(&title, site.slug);
        if slug.is_empty() {
            utils::slug::slugify(base, site.slug)
        } else {
            slug
        }
    });

    let vars = Vars {
        slug: Some(&slug),
        filename: Some(filename),
        section: Some(source.section_key),
        section_slug: Some(source.section_slug),
        date: Some(date),
        ..Vars::default()
    };

    let pattern = EXPLICIT_PATH_KEYS
        .iter()
        .find_map(|key| meta.get_str(key))
        .or_else(|| meta.get_str("page_path"))
        .unwrap_or_else(|| DEFAULT_PAGE_PATH.into());
    let path = site.localize(lang, &output_path(&pattern, &vars));
    if path::escapes_root(&path) {
        log!("warn"; "skipping {}: output path `{path}` leaves the output directory", source.id);
        return None;
    }
    let permalink = site.permalink(&path);

    let kind = match meta.get_str("status").as_deref() {
        Some("hidden") => PageKind::Hidden,
        Some("section") => PageKind::SectionPage,
        _ => PageKind::Normal,
    };

    let formats = formats(&meta, "page_formats", "page", lang, &vars, site);
    let aliases = meta
        .get_list("aliases")
        .iter()
        .map(|alias| site.localize(lang, &output_path(alias, &vars)))
        .filter(|alias| {
            let inside = !path::escapes_root(alias);
            if !inside {
                log!("warn"; "{}: dropping alias `{alias}` outside the output directory", source.id);
            }
            inside
        })
        .collect();

    let content = take_text(&mut meta, "content");
    let summary = take_text(&mut meta, "summary");

    Some(Page {
        id: source.id.to_owned(),
        lang: page_lang,
        date,
        modified,
        title,
        slug,
        path,
        permalink,
        meta,
        content,
        summary,
        formats,
        aliases,
        assets: source.assets,
        section: source.section,
        kind,
        prev: None,
        next: None,
        prev_in_section: None,
        next_in_section: None,
    })
}

/// Split `hello.zh.md` into `("hello", Some("zh"))`. The secondary extension
/// only counts when it names a configured language.
pub fn split_name<'a>(file_name: &'a str, site: &SiteInfo) -> (&'a str, Option<&'a str>) {
    let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
    match stem.rsplit_once('.') {
        Some((base, lang)) if !base.is_empty() && site.is_language(lang) => (base, Some(lang)),
        _ => (stem, None),
    }
}

/// Copy of `meta` without `keys`.
pub fn inherit(meta: &Meta, keys: &[&str]) -> Meta {
    let mut inherited = meta.clone();
    for key in keys {
        inherited.remove(key);
    }
    inherited
}

/// Expand a pattern into a file path. A pattern ending in `/` names a directory.
pub fn output_path(pattern: &str, vars: &Vars) -> String {
    let expanded = path::expand(pattern, vars);
    if expanded.is_empty() || pattern.ends_with('/') {
        path::normalize(&format!("{expanded}/index.html"))
    } else {
        expanded
    }
}

/// Declared formats: the inherited `inherited_key` table overlaid with the
/// entity's own `formats` table. Entries need a `path`; `template` defaults to
/// `<kind>.<name>.html`.
pub fn formats(
    meta: &Meta,
    inherited_key: &str,
    kind: &str,
    lang: &str,
    vars: &Vars,
    site: &SiteInfo,
) -> Vec<Format> {
    let mut declared = meta.get_meta(inherited_key).unwrap_or_default();
    if let Some(own) = meta.get_meta("formats") {
        declared.merge(&own);
    }

    declared
        .iter()
        .filter_map(|(name, value)| {
            let spec = Meta::from_value(value.clone());
            let pattern = spec.get_str("path")?;
            let path = site.localize(lang, &output_path(&pattern, vars));
            if path::escapes_root(&path) {
                log!("warn"; "dropping format `{name}`: `{path}` leaves the output directory");
                return None;
            }
            Some(Format {
                name: name.clone(),
                path,
                template: spec
                    .get_str("template")
                    .unwrap_or_else(|| format!("{kind}.{name}.html")),
            })
        })
        .collect()
}

fn meta_date(meta: &Meta, key: &str, id: &str) -> Option<NaiveDateTime> {
    let text = meta.get_str(key)?;
    let date = utils::date::parse(&text);
    if date.is_none() {
        log!("warn"; "{id}: invalid {key} `{text}`");
    }
    date
}

fn take_text(meta: &mut Meta, key: &str) -> String {
    match meta.remove(key) {
        Some(Value::String(text)) => text,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::content::test_site;
    use chrono::Datelike;
    use serde_json::json;

    /// A bare normal page in section 0, for sort and context tests.
    pub(crate) fn page_at(id: &str, title: &str, date: &str) -> Page {
        let date = utils::date::parse(date).unwrap();
        Page {
            id: id.into(),
            lang: "en".into(),
            date,
            modified: date,
            title: title.into(),
            slug: title.to_lowercase(),
            path: format!("{id}.html"),
            permalink: String::new(),
            meta: Meta::new(),
            content: String::new(),
            summary: String::new(),
            formats: Vec::new(),
            aliases: Vec::new(),
            assets: Vec::new(),
            section: SectionId::new(0),
            kind: PageKind::Normal,
            prev: None,
            next: None,
            prev_in_section: None,
            next_in_section: None,
        }
    }

    fn source<'a>(id: &'a str, file_name: &'a str, section_meta: &'a Meta) -> PageSource<'a> {
        PageSource {
            id,
            file_name,
            bundle: None,
            section: SectionId::new(0),
            section_key: "posts",
            section_slug: "posts",
            section_meta,
            assets: Vec::new(),
        }
    }

    fn meta(value: Value) -> Meta {
        Meta::from_value(value)
    }

    #[test]
    fn test_metadata_inheritance() {
        let section = meta(json!({"author": "ann", "license": "cc", "title": "Posts", "summary": "s"}));
        let file = meta(json!({"title": "Hello", "license": "mit"}));

        let page = assemble(source("posts/hello.md", "hello.md", &section), &file, "en", &test_site())
            .unwrap();

        assert_eq!(page.meta.get_str("author").as_deref(), Some("ann"));
        assert_eq!(page.meta.get_str("license").as_deref(), Some("mit"));
        assert_eq!(page.title, "Hello");
        assert_eq!(page.summary, "");
    }

    #[test]
    fn test_private_keys_not_inherited() {
        let section = meta(json!({"title": "Posts", "slug": "p", "template": "x.html", "weight": 3}));
        let file = meta(json!({"content": "body"}));

        let page = assemble(source("posts/a-b.md", "a-b.md", &section), &file, "en", &test_site())
            .unwrap();

        assert_eq!(page.title, "a-b");
        assert_eq!(page.slug, "a-b");
        assert_eq!(page.template(), "page.html");
        assert!(!page.meta.contains("weight"));
        assert_eq!(page.content, "body");
        assert!(!page.meta.contains("content"));
    }

    #[test]
    fn test_date_prefix_and_default_path() {
        let section = Meta::new();
        let file = meta(json!({"content": "x"}));

        let page = assemble(
            source("posts/2024-01-01-hello.md", "2024-01-01-hello.md", &section),
            &file,
            "en",
            &test_site(),
        )
        .unwrap();

        assert_eq!(page.date.year(), 2024);
        assert_eq!(page.modified, page.date);
        assert_eq!(page.title, "hello");
        assert_eq!(page.path, "posts/hello.html");
        assert_eq!(page.permalink, "https://example.com/posts/hello.html");
    }

    #[test]
    fn test_language_resolution() {
        let section = Meta::new();
        let file = meta(json!({"title": "你好"}));
        let site = test_site();

        let src = || source("posts/hello.zh.md", "hello.zh.md", &section);
        assert!(assemble(src(), &file, "en", &site).is_none());

        let page = assemble(src(), &file, "zh", &site).unwrap();
        assert_eq!(page.lang, "zh");
        assert!(page.path.starts_with("zh/posts/"));

        let explicit = meta(json!({"title": "x", "lang": "zh"}));
        assert!(assemble(source("posts/x.md", "x.md", &section), &explicit, "en", &site).is_none());
    }

    #[test]
    fn test_explicit_url_and_page_path() {
        let section = meta(json!({"page_path": "{date:%Y}/{slug}/"}));
        let file = meta(json!({"title": "Hi There", "date": "2023-05-06"}));
        let page = assemble(source("posts/hi.md", "hi.md", &section), &file, "en", &test_site())
            .unwrap();
        assert_eq!(page.path, "2023/hi-there/index.html");
        assert_eq!(page.permalink, "https://example.com/2023/hi-there/");

        let file = meta(json!({"title": "About", "url": "/about/"}));
        let page = assemble(source("posts/about.md", "about.md", &section), &file, "en", &test_site())
            .unwrap();
        assert_eq!(page.path, "about/index.html");
    }

    #[test]
    fn test_paths_outside_output_rejected() {
        let section = Meta::new();
        let file = meta(json!({"title": "Out", "url": "../../escaped.html"}));
        assert!(assemble(source("posts/out.md", "out.md", &section), &file, "en", &test_site()).is_none());

        let file = meta(json!({"title": "In", "aliases": ["../up/", "/old/in/"]}));
        let page = assemble(source("posts/in.md", "in.md", &section), &file, "en", &test_site())
            .unwrap();
        assert_eq!(page.aliases, vec!["old/in/index.html"]);
    }

    #[test]
    fn test_kind_formats_aliases() {
        let section = meta(json!({"page_formats": {"json": {"path": "{section}/{slug}.json"}}}));
        let file = meta(json!({
            "title": "T",
            "status": "hidden",
            "aliases": ["/old/t/"],
            "formats": {"txt": {"path": "{slug}.txt", "template": "plain.html"}}
        }));

        let page = assemble(source("posts/t.md", "t.md", &section), &file, "en", &test_site())
            .unwrap();

        assert_eq!(page.kind, PageKind::Hidden);
        assert!(!page.is_listed());
        assert_eq!(page.aliases, vec!["old/t/index.html"]);
        assert_eq!(
            page.formats,
            vec![
                Format { name: "json".into(), path: "posts/t.json".into(), template: "page.json.html".into() },
                Format { name: "txt".into(), path: "t.txt".into(), template: "plain.html".into() },
            ]
        );
    }

    #[test]
    fn test_bundle_filename() {
        let section = meta(json!({"page_path": "{filename}/index.html"}));
        let file = meta(json!({"title": "Hello"}));
        let mut src = source("posts/2024-01-01-hello/index.md", "index.md", &section);
        src.bundle = Some("2024-01-01-hello");

        let page = assemble(src, &file, "en", &test_site()).unwrap();
        assert_eq!(page.path, "2024-01-01-hello/index.html");
        assert_eq!(page.date.year(), 2024);
    }

    #[test]
    fn test_split_name() {
        let site = test_site();
        assert_eq!(split_name("a.zh.md", &site), ("a", Some("zh")));
        assert_eq!(split_name("a.de.md", &site), ("a.de", None));
        assert_eq!(split_name("a.md", &site), ("a", None));
        assert_eq!(split_name("README", &site), ("README", None));
    }
}
