//! Template variables.
//!
//! Every job carries `site` and `lang`, plus one entity body:
//!
//! | Job                | Keys                      |
//! |--------------------|---------------------------|
//! | page / page format | `page`                    |
//! | alias              | `page`, `redirect`        |
//! | section listing    | `section`, `pager`        |
//! | taxonomy index     | `taxonomy`, `terms`       |
//! | term listing       | `term`, `pager`           |
//!
//! Entities refer to each other through small `{title, path, permalink}`
//! summaries instead of nesting whole objects.

use crate::content::{
    Format, Page, PageId, Partition, Section, SectionId, SiteInfo, Taxonomy, TaxonomyTerm, TermId,
    paginate::Pager,
};
use crate::meta::Meta;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SiteView<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub language: &'a str,
    pub languages: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub struct Link<'a> {
    pub title: &'a str,
    pub path: &'a str,
    pub permalink: &'a str,
}

/// A page as listed by a section or term.
#[derive(Debug, Serialize)]
pub struct PageItem<'a> {
    pub title: &'a str,
    pub path: &'a str,
    pub permalink: &'a str,
    pub date: String,
    pub summary: &'a str,
    pub meta: &'a Meta,
}

#[derive(Debug, Serialize)]
pub struct PageView<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub slug: &'a str,
    pub path: &'a str,
    pub permalink: &'a str,
    pub date: String,
    pub modified: String,
    pub kind: &'static str,
    pub content: &'a str,
    pub summary: &'a str,
    pub meta: &'a Meta,
    pub formats: &'a [Format],
    pub aliases: &'a [String],
    pub assets: &'a [String],
    pub section: Option<Link<'a>>,
    pub prev: Option<Link<'a>>,
    pub next: Option<Link<'a>>,
    pub prev_in_section: Option<Link<'a>>,
    pub next_in_section: Option<Link<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SectionView<'a> {
    pub key: &'a str,
    pub name: &'a str,
    pub title: &'a str,
    pub slug: &'a str,
    pub path: &'a str,
    pub permalink: &'a str,
    pub meta: &'a Meta,
    pub formats: &'a [Format],
    pub assets: &'a [String],
    pub parent: Option<Link<'a>>,
    pub children: Vec<Link<'a>>,
    pub section_pages: Vec<Link<'a>>,
}

#[derive(Debug, Serialize)]
pub struct PagerLink {
    pub number: usize,
    pub path: String,
    pub permalink: String,
}

#[derive(Debug, Serialize)]
pub struct PagerView<'a> {
    pub number: usize,
    pub total: usize,
    pub path: String,
    pub permalink: String,
    pub prev: Option<PagerLink>,
    pub next: Option<PagerLink>,
    pub pages: Vec<PageItem<'a>>,
}

#[derive(Debug, Serialize)]
pub struct TermLink<'a> {
    pub name: &'a str,
    pub full: &'a str,
    pub path: &'a str,
    pub permalink: &'a str,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TaxonomyView<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub permalink: &'a str,
    pub meta: &'a Meta,
    /// Top-level terms.
    pub terms: Vec<TermLink<'a>>,
}

#[derive(Debug, Serialize)]
pub struct TermView<'a> {
    pub name: &'a str,
    pub full: &'a str,
    pub slug: &'a str,
    pub path: &'a str,
    pub permalink: &'a str,
    pub meta: &'a Meta,
    pub formats: &'a [Format],
    pub taxonomy: Link<'a>,
    pub parent: Option<TermLink<'a>>,
    pub children: Vec<TermLink<'a>>,
}

// ============================================================================
// Builders
// ============================================================================

fn date(value: NaiveDateTime) -> String {
    value.format(DATE_FORMAT).to_string()
}

fn page_link(part: &Partition, id: PageId) -> Link<'_> {
    let page = part.page(id);
    Link {
        title: &page.title,
        path: &page.path,
        permalink: &page.permalink,
    }
}

fn section_link(part: &Partition, id: SectionId) -> Link<'_> {
    let section = part.section(id);
    Link {
        title: &section.title,
        path: &section.path,
        permalink: &section.permalink,
    }
}

fn term_link(term: &TaxonomyTerm) -> TermLink<'_> {
    TermLink {
        name: &term.name,
        full: &term.full,
        path: &term.path,
        permalink: &term.permalink,
        count: term.pages.len(),
    }
}

fn page_item(page: &Page) -> PageItem<'_> {
    PageItem {
        title: &page.title,
        path: &page.path,
        permalink: &page.permalink,
        date: date(page.date),
        summary: &page.summary,
        meta: &page.meta,
    }
}

fn pager_view<'a>(
    part: &'a Partition,
    pager: &Pager<PageId>,
    path_of: impl Fn(usize) -> String,
    site: &SiteInfo,
) -> PagerView<'a> {
    let link = |number: usize| {
        let path = path_of(number);
        PagerLink {
            number,
            permalink: site.permalink(&path),
            path,
        }
    };
    let path = path_of(pager.number);
    PagerView {
        number: pager.number,
        total: pager.total,
        permalink: site.permalink(&path),
        path,
        prev: pager.prev().map(link),
        next: pager.next().map(link),
        pages: pager.items.iter().map(|&id| page_item(part.page(id))).collect(),
    }
}

/// `site` and `lang`, shared by every job.
fn envelope(site: &SiteInfo, lang: &str) -> Result<Map<String, Value>, serde_json::Error> {
    let mut vars = Map::new();
    vars.insert(
        "site".into(),
        serde_json::to_value(SiteView {
            title: &site.title,
            url: &site.url,
            language: &site.default_lang,
            languages: &site.languages,
        })?,
    );
    vars.insert("lang".into(), Value::String(lang.to_owned()));
    Ok(vars)
}

fn page_view<'a>(part: &'a Partition, page: &'a Page) -> PageView<'a> {
    let link = |id: Option<PageId>| id.map(|id| page_link(part, id));
    PageView {
        id: &page.id,
        title: &page.title,
        slug: &page.slug,
        path: &page.path,
        permalink: &page.permalink,
        date: date(page.date),
        modified: date(page.modified),
        kind: page.kind.as_str(),
        content: &page.content,
        summary: &page.summary,
        meta: &page.meta,
        formats: &page.formats,
        aliases: &page.aliases,
        assets: &page.assets,
        section: (page.section.index() < part.sections().len())
            .then(|| section_link(part, page.section)),
        prev: link(page.prev),
        next: link(page.next),
        prev_in_section: link(page.prev_in_section),
        next_in_section: link(page.next_in_section),
    }
}

/// Variables of a page, its formats included.
pub fn page_vars(part: &Partition, page: &Page, site: &SiteInfo) -> Result<Value, serde_json::Error> {
    let mut vars = envelope(site, &page.lang)?;
    vars.insert("page".into(), serde_json::to_value(page_view(part, page))?);
    Ok(Value::Object(vars))
}

/// Variables of an alias redirecting to `page`.
pub fn alias_vars(part: &Partition, page: &Page, site: &SiteInfo) -> Result<Value, serde_json::Error> {
    let mut vars = envelope(site, &page.lang)?;
    vars.insert("page".into(), serde_json::to_value(page_view(part, page))?);
    vars.insert("redirect".into(), Value::String(page.permalink.clone()));
    Ok(Value::Object(vars))
}

/// Variables of one listing page of a section.
pub fn section_vars(
    part: &Partition,
    section: &Section,
    pager: &Pager<PageId>,
    site: &SiteInfo,
) -> Result<Value, serde_json::Error> {
    let view = SectionView {
        key: &section.key,
        name: &section.name,
        title: &section.title,
        slug: &section.slug,
        path: &section.path,
        permalink: &section.permalink,
        meta: &section.meta,
        formats: &section.formats,
        assets: &section.assets,
        parent: section.parent.map(|id| section_link(part, id)),
        children: section.children.iter().map(|&id| section_link(part, id)).collect(),
        section_pages: section
            .section_pages
            .iter()
            .map(|&id| page_link(part, id))
            .collect(),
    };

    let mut vars = envelope(site, &section.lang)?;
    vars.insert("section".into(), serde_json::to_value(view)?);
    let pager = pager_view(part, pager, |n| section.pager_path(n, site), site);
    vars.insert("pager".into(), serde_json::to_value(pager)?);
    Ok(Value::Object(vars))
}

/// Variables of a taxonomy index listing `terms`.
pub fn taxonomy_vars(
    part: &Partition,
    taxonomy: &Taxonomy,
    terms: &[TaxonomyTerm],
    site: &SiteInfo,
) -> Result<Value, serde_json::Error> {
    let view = TaxonomyView {
        name: &taxonomy.name,
        path: &taxonomy.path,
        permalink: &taxonomy.permalink,
        meta: &taxonomy.meta,
        terms: taxonomy
            .terms
            .iter()
            .map(|&id| term_link(part.term(id)))
            .collect(),
    };

    let mut vars = envelope(site, &taxonomy.lang)?;
    vars.insert("taxonomy".into(), serde_json::to_value(view)?);
    let terms: Vec<_> = terms.iter().map(term_link).collect();
    vars.insert("terms".into(), serde_json::to_value(terms)?);
    Ok(Value::Object(vars))
}

/// Variables of one listing page of a term.
pub fn term_vars(
    part: &Partition,
    term: &TaxonomyTerm,
    pager: &Pager<PageId>,
    site: &SiteInfo,
) -> Result<Value, serde_json::Error> {
    let taxonomy = part.taxonomy(term.taxonomy);
    let child = |id: &TermId| term_link(part.term(*id));
    let view = TermView {
        name: &term.name,
        full: &term.full,
        slug: &term.slug,
        path: &term.path,
        permalink: &term.permalink,
        meta: &term.meta,
        formats: &term.formats,
        taxonomy: Link {
            title: &taxonomy.name,
            path: &taxonomy.path,
            permalink: &taxonomy.permalink,
        },
        parent: term.parent.map(|id| term_link(part.term(id))),
        children: term.children.iter().map(child).collect(),
    };

    let mut vars = envelope(site, &term.lang)?;
    vars.insert("term".into(), serde_json::to_value(view)?);
    let pager = pager_view(part, pager, |n| term.pager_path(n, site), site);
    vars.insert("pager".into(), serde_json::to_value(pager)?);
    Ok(Value::Object(vars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{
        Context, TaxonomyDef, TaxonomyId, page::tests::page_at, paginate::paginate, section::tests::test_section,
        taxonomy, test_site,
    };
    use serde_json::json;

    /// Root section with two tagged pages linked prev/next.
    fn graph() -> Context {
        let ctx = Context::new();
        let mut root = test_section("");
        root.title = "Home".into();
        root.path = "index.html".into();
        ctx.insert_section("en", root).unwrap();

        let defs = vec![TaxonomyDef::new("tags", Meta::new())];
        for (id, title, day) in [("a.md", "A", "2024-01-01"), ("b.md", "B", "2024-01-02")] {
            let mut page = page_at(id, title, day);
            page.meta.insert("tags", json!(["x/y"]));
            let values: Vec<_> = defs.iter().map(|d| d.values(&page, "")).collect();
            let page_id = ctx.insert_page("en", page).unwrap();
            taxonomy::assemble(&ctx, "en", page_id, &values, &defs, &test_site());
        }
        ctx.write("en", |part| {
            part.pages[0].prev = Some(PageId::new(1));
            part.pages[1].next = Some(PageId::new(0));
        });
        ctx
    }

    #[test]
    fn test_page_vars() {
        let ctx = graph();
        let site = test_site();
        let vars = ctx
            .read("en", |part| page_vars(part, part.page(PageId::new(0)), &site))
            .unwrap()
            .unwrap();

        assert_eq!(vars["site"]["title"], "Test Site");
        assert_eq!(vars["lang"], "en");
        assert_eq!(vars["page"]["title"], "A");
        assert_eq!(vars["page"]["kind"], "normal");
        assert_eq!(vars["page"]["date"], "2024-01-01T00:00:00");
        assert_eq!(vars["page"]["meta"]["tags"], json!(["x/y"]));
        assert_eq!(vars["page"]["section"]["title"], "Home");
        assert_eq!(vars["page"]["prev"]["title"], "B");
        assert!(vars["page"]["next"].is_null());
    }

    #[test]
    fn test_alias_vars() {
        let ctx = graph();
        let site = test_site();
        let vars = ctx
            .read("en", |part| {
                let mut page = part.page(PageId::new(0)).clone();
                page.permalink = "https://example.com/a.html".into();
                alias_vars(part, &page, &site)
            })
            .unwrap()
            .unwrap();
        assert_eq!(vars["redirect"], "https://example.com/a.html");
    }

    #[test]
    fn test_section_vars_pager() {
        let ctx = graph();
        let site = test_site();
        let vars = ctx
            .read("en", |part| {
                let mut section = part.section(SectionId::new(0)).clone();
                section.path_pattern = "{section}/{number}/index.html".into();
                let pagers = paginate(&[PageId::new(1), PageId::new(0)], 1);
                section_vars(part, &section, &pagers[0], &site)
            })
            .unwrap()
            .unwrap();

        assert_eq!(vars["section"]["title"], "Home");
        assert!(vars["section"]["parent"].is_null());
        assert_eq!(vars["pager"]["number"], 1);
        assert_eq!(vars["pager"]["total"], 2);
        assert_eq!(vars["pager"]["path"], "index.html");
        assert!(vars["pager"]["prev"].is_null());
        assert_eq!(vars["pager"]["next"]["path"], "2/index.html");
        assert_eq!(vars["pager"]["next"]["permalink"], "https://example.com/2/");
        assert_eq!(vars["pager"]["pages"][0]["title"], "B");
    }

    #[test]
    fn test_taxonomy_and_term_vars() {
        let ctx = graph();
        let site = test_site();
        ctx.read("en", |part| {
            let taxonomy = part.taxonomy(part.find_taxonomy("tags").unwrap());
            let terms: Vec<_> = part.terms().to_vec();
            let vars = taxonomy_vars(part, taxonomy, &terms, &site).unwrap();
            assert_eq!(vars["taxonomy"]["name"], "tags");
            assert_eq!(vars["taxonomy"]["terms"].as_array().unwrap().len(), 1);
            assert_eq!(vars["terms"].as_array().unwrap().len(), 2);
            assert_eq!(vars["terms"][0]["count"], 2);

            let leaf = part.term(part.find_term(TaxonomyId::new(0), "x/y").unwrap());
            let pagers = paginate(&leaf.pages, 0);
            let vars = term_vars(part, leaf, &pagers[0], &site).unwrap();
            assert_eq!(vars["term"]["full"], "x/y");
            assert_eq!(vars["term"]["parent"]["full"], "x");
            assert_eq!(vars["term"]["taxonomy"]["title"], "tags");
            assert_eq!(vars["pager"]["pages"].as_array().unwrap().len(), 2);
            assert_eq!(vars["pager"]["path"], "tags/x/y/index.html");
        })
        .unwrap();
    }
}
