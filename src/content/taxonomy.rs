//! Taxonomies and hierarchical terms.
//!
//! A taxonomy is a classification axis (`tags`, `categories`, an archive by
//! date). Term values are slash-delimited paths: a page tagged `linux/emacs`
//! joins term `linux` and its child `linux/emacs`.
//!
//! # Value sources
//!
//! | `key`          | Values                                            |
//! |----------------|---------------------------------------------------|
//! | *(unset)*      | metadata field named like the taxonomy            |
//! | `field`        | metadata field `field` (string, list, or `a, b`)  |
//! | `@date:<fmt>`  | page date formatted with `fmt`, e.g. `%Y/%m`      |
//! | `@section`     | owning section's directory path                   |

use super::{
    Context, Format, Page, PageId, SiteInfo, TaxonomyId, TermId,
    page::{formats, output_path},
    path::{Vars, format_date},
    sort::OrderBy,
};
use crate::{config::SiteConfig, meta::Meta, utils::slug::slugify_path};
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

pub const DEFAULT_TAXONOMY_PATH: &str = "{taxonomy}/index.html";
pub const DEFAULT_TERM_PATH: &str = "{taxonomy}/{term:slug}/{number}/index.html";

/// Prefix chain of one term value: `a/b/c` → `[a, a/b, a/b/c]`.
pub type Prefixes = SmallVec<[String; 4]>;

// ============================================================================
// Definitions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomySource {
    Field(String),
    Date(String),
    Section,
}

/// A configured taxonomy kind.
#[derive(Debug, Clone)]
pub struct TaxonomyDef {
    pub name: String,
    pub source: TaxonomySource,
    pub meta: Arc<Meta>,
}

impl TaxonomyDef {
    pub fn new(name: &str, meta: Meta) -> Self {
        let key = meta.get_str("key").unwrap_or_else(|| name.to_owned());
        let source = if key == "@section" {
            TaxonomySource::Section
        } else if let Some(fmt) = key.strip_prefix("@date:") {
            TaxonomySource::Date(fmt.to_owned())
        } else {
            TaxonomySource::Field(key)
        };
        Self {
            name: name.to_owned(),
            source,
            meta: Arc::new(meta),
        }
    }

    pub fn from_config(config: &SiteConfig) -> Vec<Self> {
        config
            .taxonomies_meta()
            .into_iter()
            .map(|(name, meta)| Self::new(&name, meta))
            .collect()
    }

    /// Distinct, non-empty values of a page for this taxonomy.
    pub fn values(&self, page: &Page, section_key: &str) -> Vec<String> {
        let raw = match &self.source {
            TaxonomySource::Field(key) => match page.meta.get(key) {
                Some(Value::String(text)) => text.split(',').map(str::to_owned).collect(),
                Some(Value::Array(_)) => page.meta.get_list(key),
                _ => Vec::new(),
            },
            TaxonomySource::Date(fmt) => vec![format_date(page.date, fmt)],
            TaxonomySource::Section => vec![section_key.to_owned()],
        };

        let mut values: Vec<String> = Vec::with_capacity(raw.len());
        for value in raw {
            let value = value.trim().to_owned();
            if !value.is_empty() && !values.contains(&value) {
                values.push(value);
            }
        }
        values
    }

    /// The taxonomy entity for `lang`.
    pub fn build_taxonomy(&self, lang: &str, site: &SiteInfo) -> Taxonomy {
        let pattern = self
            .meta
            .get_str("path")
            .unwrap_or_else(|| DEFAULT_TAXONOMY_PATH.into());
        let vars = Vars {
            slug: Some(&self.name),
            taxonomy: Some(&self.name),
            ..Vars::default()
        };
        let path = site.localize(lang, &output_path(&pattern, &vars));

        Taxonomy {
            name: self.name.clone(),
            lang: lang.to_owned(),
            meta: Arc::clone(&self.meta),
            permalink: site.permalink(&path),
            path,
            terms: Vec::new(),
        }
    }

    /// A new term for the full path `full`. Its taxonomy and parent are set on insertion.
    pub fn build_term(&self, full: &str, lang: &str, site: &SiteInfo) -> TaxonomyTerm {
        let name = full.rsplit('/').next().unwrap_or(full).to_owned();
        let slug = slugify_path(full, site.slug);
        let meta = self
            .meta
            .get_meta(&format!("terms.{full}"))
            .unwrap_or_default();

        let mut term = TaxonomyTerm {
            name,
            full: full.to_owned(),
            slug,
            lang: lang.to_owned(),
            taxonomy_name: self.name.clone(),
            path: String::new(),
            permalink: String::new(),
            path_pattern: self
                .meta
                .get_str("term_path")
                .unwrap_or_else(|| DEFAULT_TERM_PATH.into()),
            formats: Vec::new(),
            meta,
            taxonomy: TaxonomyId::new(0),
            pages: Vec::new(),
            parent: None,
            children: Vec::new(),
        };

        term.path = term.pager_path(1, site);
        term.permalink = site.permalink(&term.path);

        let mut declared = Meta::new();
        if let Some(shared) = self.meta.get("term_formats") {
            declared.insert("term_formats", shared.clone());
        }
        if let Some(own) = term.meta.get("formats") {
            declared.insert("formats", own.clone());
        }
        term.formats = formats(&declared, "term_formats", "term", lang, &term.vars(1), site);
        term
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone)]
pub struct Taxonomy {
    pub name: String,
    pub lang: String,
    pub meta: Arc<Meta>,
    pub path: String,
    pub permalink: String,
    /// Top-level terms.
    pub terms: Vec<TermId>,
}

impl Taxonomy {
    pub fn template(&self) -> String {
        self.meta.get_str("template").unwrap_or_else(|| "taxonomy.html".into())
    }

    pub fn term_template(&self) -> String {
        self.meta
            .get_str("term_template")
            .unwrap_or_else(|| "taxonomy.terms.html".into())
    }

    pub fn paginate(&self) -> i64 {
        self.meta.get_i64("paginate").unwrap_or(0)
    }

    /// Order of a term's member pages.
    pub fn orderby(&self) -> OrderBy {
        OrderBy::from_meta(&self.meta, "orderby", "date desc")
    }

    /// Order of terms in listings.
    pub fn term_orderby(&self) -> OrderBy {
        OrderBy::from_meta(&self.meta, "term_orderby", "name")
    }
}

#[derive(Debug, Clone)]
pub struct TaxonomyTerm {
    /// Leaf segment.
    pub name: String,
    /// Full slash path, unique within its taxonomy.
    pub full: String,
    pub slug: String,
    pub lang: String,
    pub taxonomy_name: String,
    pub path: String,
    pub permalink: String,
    pub path_pattern: String,
    pub formats: Vec<Format>,
    pub meta: Meta,
    pub taxonomy: TaxonomyId,
    pub pages: Vec<PageId>,
    pub parent: Option<TermId>,
    pub children: Vec<TermId>,
}

impl TaxonomyTerm {
    pub fn real_name(&self) -> &str {
        &self.full
    }

    fn vars(&self, number: usize) -> Vars<'_> {
        Vars {
            slug: Some(&self.slug),
            taxonomy: Some(&self.taxonomy_name),
            term: Some(&self.full),
            term_slug: Some(&self.slug),
            number: Some(number),
            ..Vars::default()
        }
    }

    /// Output path of the member listing page `number` (1-based).
    pub fn pager_path(&self, number: usize, site: &SiteInfo) -> String {
        site.localize(&self.lang, &output_path(&self.path_pattern, &self.vars(number)))
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Split a term value into its prefix chain, dropping empty segments.
pub fn prefixes(value: &str) -> Prefixes {
    let mut chain = Prefixes::new();
    let mut full = String::new();
    for segment in value.split('/').map(str::trim).filter(|s| !s.is_empty()) {
        if !full.is_empty() {
            full.push('/');
        }
        full.push_str(segment);
        chain.push(full.clone());
    }
    chain
}

/// Thread an inserted page into the terms of every taxonomy.
///
/// `values[i]` holds the page's values for `defs[i]`, computed before the
/// page moved into the context.
pub fn assemble(
    ctx: &Context,
    lang: &str,
    page: PageId,
    values: &[Vec<String>],
    defs: &[TaxonomyDef],
    site: &SiteInfo,
) {
    for (def, values) in defs.iter().zip(values) {
        let chains: Vec<Prefixes> = values
            .iter()
            .map(|value| prefixes(value))
            .filter(|chain| !chain.is_empty())
            .collect();
        if chains.is_empty() {
            continue;
        }

        let taxonomy = match ctx.find_taxonomy(lang, &def.name) {
            Some(id) => id,
            None => ctx.insert_taxonomy(lang, def.build_taxonomy(lang, site)),
        };
        ctx.thread_page_into_terms(lang, taxonomy, page, &chains, |full| {
            def.build_term(full, lang, site)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{SectionId, page::tests::page_at, section::tests::test_section, test_site};
    use serde_json::json;

    fn def(name: &str, meta: Value) -> TaxonomyDef {
        TaxonomyDef::new(name, Meta::from_value(meta))
    }

    fn root(ctx: &Context) -> SectionId {
        ctx.insert_section("en", test_section("")).unwrap()
    }

    /// Insert a page carrying `tags` and thread it into the `tags` taxonomy.
    fn tagged(ctx: &Context, defs: &[TaxonomyDef], id: &str, tags: Value) -> PageId {
        let mut page = page_at(id, id, "2024-01-01");
        page.meta.insert("tags", tags);
        let values: Vec<_> = defs.iter().map(|d| d.values(&page, "")).collect();
        let page_id = ctx.insert_page("en", page).unwrap();
        assemble(ctx, "en", page_id, &values, defs, &test_site());
        page_id
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(prefixes("a/b/c").to_vec(), vec!["a", "a/b", "a/b/c"]);
        assert_eq!(prefixes("/a//b/ ").to_vec(), vec!["a", "a/b"]);
        assert!(prefixes(" / ").is_empty());
    }

    #[test]
    fn test_source_from_key() {
        assert_eq!(def("tags", json!({})).source, TaxonomySource::Field("tags".into()));
        assert_eq!(def("x", json!({"key": "topics"})).source, TaxonomySource::Field("topics".into()));
        assert_eq!(def("x", json!({"key": "@date:%Y/%m"})).source, TaxonomySource::Date("%Y/%m".into()));
        assert_eq!(def("x", json!({"key": "@section"})).source, TaxonomySource::Section);
    }

    #[test]
    fn test_values() {
        let mut page = page_at("a.md", "A", "2024-03-05");
        page.meta.insert("tags", json!("rust, go ,rust,"));
        page.meta.insert("categories", json!(["dev/tools", "dev/tools", "misc"]));

        assert_eq!(def("tags", json!({})).values(&page, ""), vec!["rust", "go"]);
        assert_eq!(def("categories", json!({})).values(&page, ""), vec!["dev/tools", "misc"]);
        assert_eq!(def("archives", json!({"key": "@date:%Y/%m"})).values(&page, ""), vec!["2024/03"]);
        assert_eq!(def("s", json!({"key": "@section"})).values(&page, "posts/linux"), vec!["posts/linux"]);
        assert!(def("s", json!({"key": "@section"})).values(&page, "").is_empty());
        assert!(def("authors", json!({})).values(&page, "").is_empty());
    }

    #[test]
    fn test_build_term_paths() {
        let tags = def("tags", json!({
            "term_formats": {"atom": {"path": "{taxonomy}/{term:slug}/atom.xml"}},
            "terms": {"linux/emacs": {"weight": 2}}
        }));
        let term = tags.build_term("Linux/Emacs", "en", &test_site());

        assert_eq!(term.name, "Emacs");
        assert_eq!(term.slug, "linux/emacs");
        assert_eq!(term.path, "tags/linux/emacs/index.html");
        assert_eq!(term.pager_path(2, &test_site()), "tags/linux/emacs/2/index.html");
        assert_eq!(term.permalink, "https://example.com/tags/linux/emacs/");
        assert_eq!(term.formats[0].path, "tags/linux/emacs/atom.xml");

        let term = tags.build_term("linux/emacs", "zh", &test_site());
        assert_eq!(term.meta.get_i64("weight"), Some(2));
        assert_eq!(term.path, "zh/tags/linux/emacs/index.html");

        let taxonomy = tags.build_taxonomy("en", &test_site());
        assert_eq!(taxonomy.path, "tags/index.html");
        assert_eq!(taxonomy.template(), "taxonomy.html");
        assert_eq!(taxonomy.term_template(), "taxonomy.terms.html");
    }

    #[test]
    fn test_hierarchy_construction() {
        let ctx = Context::new();
        root(&ctx);
        let defs = vec![def("tags", json!({}))];
        let page = tagged(&ctx, &defs, "p.md", json!(["a/b/c"]));

        ctx.read("en", |part| {
            let taxonomy = part.find_taxonomy("tags").unwrap();
            let terms: Vec<_> = part.terms().iter().map(|t| t.full.as_str()).collect();
            assert_eq!(terms, vec!["a", "a/b", "a/b/c"]);

            let a = part.find_term(taxonomy, "a").unwrap();
            let ab = part.find_term(taxonomy, "a/b").unwrap();
            let abc = part.find_term(taxonomy, "a/b/c").unwrap();

            assert_eq!(part.taxonomy(taxonomy).terms, vec![a]);
            assert_eq!(part.term(a).children, vec![ab]);
            assert_eq!(part.term(ab).children, vec![abc]);
            assert_eq!(part.term(ab).parent, Some(a));
            assert_eq!(part.term(abc).name, "c");
            for id in [a, ab, abc] {
                assert_eq!(part.term(id).pages, vec![page]);
            }
        })
        .unwrap();
    }

    #[test]
    fn test_two_top_level_terms() {
        let ctx = Context::new();
        root(&ctx);
        let defs = vec![def("tags", json!({}))];
        tagged(&ctx, &defs, "1.md", json!(["foo", "bar"]));
        tagged(&ctx, &defs, "2.md", json!(["foo", "bar"]));
        tagged(&ctx, &defs, "3.md", json!(["foo"]));

        ctx.read("en", |part| {
            let taxonomy = part.find_taxonomy("tags").unwrap();
            assert_eq!(part.taxonomy(taxonomy).terms.len(), 2);

            let foo = part.find_term(taxonomy, "foo").unwrap();
            let bar = part.find_term(taxonomy, "bar").unwrap();
            assert_eq!(part.term(foo).pages.len(), 3);
            assert_eq!(part.term(bar).pages.len(), 2);
        })
        .unwrap();
    }

    #[test]
    fn test_spellings_sharing_a_slug_are_one_term() {
        let order = |first: &str, second: &str| {
            let ctx = Context::new();
            root(&ctx);
            let defs = vec![def("tags", json!({}))];
            tagged(&ctx, &defs, "a.md", json!([first]));
            tagged(&ctx, &defs, "b.md", json!([second]));

            ctx.read("en", |part| {
                let taxonomy = part.find_taxonomy("tags").unwrap();
                assert_eq!(part.terms().len(), 2);
                let rust = part.find_term(taxonomy, "rust").unwrap();
                assert_eq!(part.find_term(taxonomy, "Rust"), Some(rust));
                assert_eq!(part.taxonomy(taxonomy).terms, vec![rust]);

                let term = part.term(rust);
                assert_eq!(term.pages.len(), 2);
                assert_eq!(term.children.len(), 1);
                assert_eq!(term.path, "tags/rust/index.html");
                (term.full.clone(), part.term(term.children[0]).full.clone())
            })
            .unwrap()
        };

        let expected = ("Rust".to_owned(), "Rust/async".to_owned());
        assert_eq!(order("rust/async", "Rust/Async"), ("Rust".to_owned(), "Rust/Async".to_owned()));
        assert_eq!(order("Rust/async", "rust/async"), expected);
        assert_eq!(order("rust/async", "Rust/async"), expected);
    }

    #[test]
    fn test_shared_prefix_joined_once() {
        let ctx = Context::new();
        root(&ctx);
        let defs = vec![def("tags", json!({}))];
        let page = tagged(&ctx, &defs, "p.md", json!(["dev/rust", "dev/go"]));

        ctx.read("en", |part| {
            let taxonomy = part.find_taxonomy("tags").unwrap();
            let dev = part.find_term(taxonomy, "dev").unwrap();
            assert_eq!(part.term(dev).pages, vec![page]);
            assert_eq!(part.term(dev).children.len(), 2);
        })
        .unwrap();
    }

    #[test]
    fn test_concurrent_threading_appends_children_once() {
        use rayon::prelude::*;

        let ctx = Context::new();
        root(&ctx);
        let defs = vec![def("tags", json!({}))];

        (0..64).into_par_iter().for_each(|i| {
            tagged(&ctx, &defs, &format!("{i}.md"), json!(["x/y/z"]));
        });

        ctx.read("en", |part| {
            let taxonomy = part.find_taxonomy("tags").unwrap();
            assert_eq!(part.taxonomies().len(), 1);
            assert_eq!(part.terms().len(), 3);

            let x = part.find_term(taxonomy, "x").unwrap();
            let y = part.find_term(taxonomy, "x/y").unwrap();
            assert_eq!(part.taxonomy(taxonomy).terms, vec![x]);
            assert_eq!(part.term(x).children, vec![y]);
            assert_eq!(part.term(y).pages.len(), 64);
        })
        .unwrap();
    }
}
