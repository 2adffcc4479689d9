//! Sections: directory-scoped grouping nodes.
//!
//! Section metadata is layered, later layers winning key by key:
//!
//! ```text
//! [sections._default]  ⊕  parent meta − private keys  ⊕  [sections."<real name>"]  ⊕  _index file
//! ```

use super::{
    Format, PageId, SectionId, SiteInfo,
    page::{self, inherit, output_path},
    path::Vars,
    sort::OrderBy,
};
use crate::{meta::Meta, utils::slug::slugify};
use std::sync::Arc;

/// Default output pattern of a section listing.
pub const DEFAULT_SECTION_PATH: &str = "{section}/{number}/index.html";

/// Keys a child section never inherits from its parent.
const PRIVATE_KEYS: &[&str] = &[
    "title",
    "content",
    "summary",
    "slug",
    "aliases",
    "date",
    "modified",
    "url",
    "save_as",
    "path",
    "template",
    "formats",
    "weight",
    "ignore_files",
    "lang",
];

#[derive(Debug, Clone)]
pub struct Section {
    /// Directory path relative to the content root, `""` for the root.
    pub key: String,
    /// Directory basename.
    pub name: String,
    pub lang: String,
    pub meta: Arc<Meta>,
    pub title: String,
    /// Slash-separated slug path, `""` for the root.
    pub slug: String,
    /// Output path of the first listing page.
    pub path: String,
    pub permalink: String,
    /// Unexpanded output pattern, re-expanded per pager.
    pub path_pattern: String,
    pub formats: Vec<Format>,
    pub parent: Option<SectionId>,
    pub children: Vec<SectionId>,
    pub pages: Vec<PageId>,
    pub hidden_pages: Vec<PageId>,
    pub section_pages: Vec<PageId>,
    /// Files without a reader, relative to the content root.
    pub assets: Vec<String>,
}

impl Section {
    /// Dotted directory path: `posts/linux` → `posts.linux`, root → `""`.
    pub fn real_name(&self) -> String {
        self.key.replace('/', ".")
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn template(&self) -> String {
        let fallback = if self.is_root() { "index.html" } else { "section.html" };
        self.meta
            .get_str("template")
            .unwrap_or_else(|| fallback.into())
    }

    /// Listing page size; `0` renders one unpaginated listing.
    pub fn paginate(&self) -> i64 {
        self.meta.get_i64("paginate").unwrap_or(0)
    }

    pub fn orderby(&self) -> OrderBy {
        OrderBy::from_meta(&self.meta, "orderby", "date desc")
    }

    pub fn weight(&self) -> i64 {
        self.meta.get_i64("weight").unwrap_or(0)
    }

    fn vars(&self, number: usize) -> Vars<'_> {
        Vars {
            slug: Some(&self.slug),
            filename: Some(&self.name),
            section: Some(&self.key),
            section_slug: Some(&self.slug),
            number: Some(number),
            ..Vars::default()
        }
    }

    /// Output path of the listing page `number` (1-based).
    pub fn pager_path(&self, number: usize, site: &SiteInfo) -> String {
        site.localize(&self.lang, &output_path(&self.path_pattern, &self.vars(number)))
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Everything a section is built from.
#[derive(Debug, Clone, Copy)]
pub struct SectionSource<'a> {
    pub key: &'a str,
    pub parent: Option<SectionId>,
    pub parent_meta: Option<&'a Meta>,
    pub parent_slug: &'a str,
    /// `[sections._default]`
    pub defaults: &'a Meta,
    /// `[sections."<real name>"]`
    pub configured: Option<&'a Meta>,
    /// Parsed `_index` file.
    pub index: Option<&'a Meta>,
}

/// Layer the metadata of a section.
pub fn section_meta(source: &SectionSource) -> Meta {
    let mut meta = source.defaults.clone();
    if let Some(parent) = source.parent_meta {
        meta.merge(&inherit(parent, PRIVATE_KEYS));
    }
    for layer in [source.configured, source.index].into_iter().flatten() {
        meta.merge(layer);
    }
    meta
}

pub fn assemble(source: &SectionSource, lang: &str, site: &SiteInfo) -> Section {
    let meta = section_meta(source);
    let name = source.key.rsplit('/').next().unwrap_or_default().to_owned();
    let is_root = source.parent.is_none();

    let title = meta.get_str("title").unwrap_or_else(|| {
        if is_root { site.title.clone() } else { name.clone() }
    });

    let slug = if is_root {
        String::new()
    } else {
        let own = meta
            .get_str("slug")
            .unwrap_or_else(|| slugify(&name, site.slug));
        super::path::normalize(&format!("{}/{own}", source.parent_slug))
    };

    let path_pattern = meta
        .get_str("path")
        .unwrap_or_else(|| DEFAULT_SECTION_PATH.into());

    let mut section = Section {
        key: source.key.to_owned(),
        name,
        lang: lang.to_owned(),
        meta: Arc::new(Meta::new()),
        title,
        slug,
        path: String::new(),
        permalink: String::new(),
        path_pattern,
        formats: Vec::new(),
        parent: source.parent,
        children: Vec::new(),
        pages: Vec::new(),
        hidden_pages: Vec::new(),
        section_pages: Vec::new(),
        assets: Vec::new(),
    };

    section.path = section.pager_path(1, site);
    section.permalink = site.permalink(&section.path);
    section.formats = page::formats(&meta, "section_formats", "section", lang, &section.vars(1), site);
    section.meta = Arc::new(meta);
    section
}
