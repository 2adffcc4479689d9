//! Turns a finalized language partition into render jobs.
//!
//! Entity lists are cloned out of the context, passed through the list hooks
//! without any lock held, and the survivors are expanded into jobs:
//!
//! | Entity   | Jobs                                                        |
//! |----------|-------------------------------------------------------------|
//! | page     | primary, one per format, one per alias (`alias.html`)       |
//! | section  | one per listing pager, one per format (unpaginated)         |
//! | taxonomy | index                                                       |
//! | term     | one per listing pager, one per format (unpaginated)         |
//!
//! An empty listing produces no pager and therefore no listing job.

use super::BuildEnv;
use crate::{
    content::{
        Page, PageId, Partition, Section, SiteInfo, Taxonomy, TaxonomyTerm,
        paginate::{Pager, paginate},
    },
    log,
    writer::{RenderJob, vars},
};
use serde_json::Value;

const ALIAS_TEMPLATE: &str = "alias.html";

/// Hook-filtered entity lists of one language.
struct Lists {
    pages: Vec<Page>,
    sections: Vec<Section>,
    taxonomies: Vec<(Taxonomy, Vec<TaxonomyTerm>)>,
}

pub(super) fn jobs(env: &BuildEnv, lang: &str) -> Vec<RenderJob> {
    let Some(lists) = lists(env, lang) else {
        return Vec::new();
    };

    let jobs = env.ctx.read(lang, |part| {
        let mut jobs = Jobs {
            part,
            site: &env.site,
            lang,
            out: Vec::new(),
        };
        for page in &lists.pages {
            jobs.page(page);
        }
        for section in &lists.sections {
            jobs.section(section);
        }
        for (taxonomy, terms) in &lists.taxonomies {
            jobs.taxonomy(taxonomy, terms);
        }
        jobs.out
    });
    jobs.unwrap_or_default()
}

fn lists(env: &BuildEnv, lang: &str) -> Option<Lists> {
    let (pages, sections, taxonomies) = env.ctx.read(lang, |part| {
        (
            part.pages().to_vec(),
            part.sections().to_vec(),
            part.taxonomies().to_vec(),
        )
    })?;

    let pages = env.hooks.pages(pages);
    let sections = env.hooks.sections(sections);
    let taxonomies = env
        .hooks
        .taxonomies(taxonomies)
        .into_iter()
        .map(|taxonomy| {
            let terms: Vec<TaxonomyTerm> = env
                .ctx
                .read(lang, |part| {
                    let id = part.find_taxonomy(&taxonomy.name)?;
                    Some(
                        part.taxonomy_terms(id)
                            .into_iter()
                            .map(|term| part.term(term).clone())
                            .collect(),
                    )
                })
                .flatten()
                .unwrap_or_default();
            (taxonomy, env.hooks.terms(terms))
        })
        .collect();

    Some(Lists {
        pages,
        sections,
        taxonomies,
    })
}

struct Jobs<'a> {
    part: &'a Partition,
    site: &'a SiteInfo,
    lang: &'a str,
    out: Vec<RenderJob>,
}

impl Jobs<'_> {
    fn push(&mut self, template: String, path: String, vars: Result<Value, serde_json::Error>) {
        match vars {
            Ok(vars) => self.out.push(RenderJob {
                lang: self.lang.to_owned(),
                template,
                path,
                vars,
            }),
            Err(e) => log!("error"; "{path}: {e}"),
        }
    }

    fn page(&mut self, page: &Page) {
        let (part, site) = (self.part, self.site);
        self.push(page.template(), page.path.clone(), vars::page_vars(part, page, site));
        for format in &page.formats {
            self.push(
                format.template.clone(),
                format.path.clone(),
                vars::page_vars(part, page, site),
            );
        }
        for alias in &page.aliases {
            self.push(
                ALIAS_TEMPLATE.to_owned(),
                alias.clone(),
                vars::alias_vars(part, page, site),
            );
        }
    }

    fn section(&mut self, section: &Section) {
        let (part, site) = (self.part, self.site);
        let Some(id) = part.find_section(&section.key) else {
            return;
        };
        let order = section.orderby();
        let mut listing = part.subtree_pages(id);
        listing.sort_by(|&a, &b| order.compare_pages(part.page(a), part.page(b)));

        let template = section.template();
        for pager in paginate(&listing, section.paginate()) {
            self.push(
                template.clone(),
                section.pager_path(pager.number, site),
                vars::section_vars(part, section, &pager, site),
            );
        }
        for format in &section.formats {
            self.push(
                format.template.clone(),
                format.path.clone(),
                vars::section_vars(part, section, &whole(&listing), site),
            );
        }
    }

    fn taxonomy(&mut self, taxonomy: &Taxonomy, terms: &[TaxonomyTerm]) {
        let (part, site) = (self.part, self.site);
        let order = taxonomy.term_orderby();
        let mut listed = terms.to_vec();
        listed.sort_by(|a, b| order.compare_terms(a, b));

        self.push(
            taxonomy.template(),
            taxonomy.path.clone(),
            vars::taxonomy_vars(part, taxonomy, &listed, site),
        );

        for term in terms {
            let template = term
                .meta
                .get_str("template")
                .unwrap_or_else(|| taxonomy.term_template());
            for pager in paginate(&term.pages, taxonomy.paginate()) {
                self.push(
                    template.clone(),
                    term.pager_path(pager.number, site),
                    vars::term_vars(part, term, &pager, site),
                );
            }
            for format in &term.formats {
                self.push(
                    format.template.clone(),
                    format.path.clone(),
                    vars::term_vars(part, term, &whole(&term.pages), site),
                );
            }
        }
    }
}

/// A single pager holding the whole listing.
fn whole(items: &[PageId]) -> Pager<PageId> {
    Pager {
        number: 1,
        total: 1,
        items: items.to_vec(),
    }
}
