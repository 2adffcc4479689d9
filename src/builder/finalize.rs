//! Deterministic ordering pass.
//!
//! Parse workers insert in lock-acquisition order, which changes from run to
//! run. Once a language's parse pool is drained this pass sorts every list
//! and computes sibling links from the sorted snapshot, single-threaded under
//! one exclusive lock.
//!
//! | List                          | Order                               |
//! |-------------------------------|-------------------------------------|
//! | section `children`            | `weight`, then directory name       |
//! | section page lists            | section `orderby` (`date desc`)     |
//! | `prev`/`next` (global)        | listed pages by `date desc`         |
//! | taxonomy terms, term children | full term path                      |
//! | term `pages`                  | taxonomy `orderby` (`date desc`)    |

use crate::content::{Context, PageId, Partition, sort::OrderBy};

/// Order of the global `prev`/`next` chain.
const GLOBAL_ORDER: &str = "date desc";

pub fn finalize(ctx: &Context, lang: &str) {
    ctx.write(lang, |part| {
        sort_children(part);
        sort_section_pages(part);
        link_in_sections(part);
        link_global(part);
        sort_terms(part);
    });
}

fn sort_children(part: &mut Partition) {
    for i in 0..part.sections.len() {
        let mut children = std::mem::take(&mut part.sections[i].children);
        children.sort_by(|&a, &b| {
            let (a, b) = (part.section(a), part.section(b));
            a.weight()
                .cmp(&b.weight())
                .then_with(|| a.name.cmp(&b.name))
        });
        part.sections[i].children = children;
    }
}

fn sort_pages(part: &Partition, ids: &mut [PageId], order: &OrderBy) {
    ids.sort_by(|&a, &b| order.compare_pages(part.page(a), part.page(b)));
}

fn sort_section_pages(part: &mut Partition) {
    for i in 0..part.sections.len() {
        let order = part.sections[i].orderby();
        let section = &mut part.sections[i];
        let mut lists = [
            std::mem::take(&mut section.pages),
            std::mem::take(&mut section.hidden_pages),
            std::mem::take(&mut section.section_pages),
        ];
        for list in &mut lists {
            sort_pages(part, list, &order);
        }
        let [pages, hidden_pages, section_pages] = lists;
        let section = &mut part.sections[i];
        section.pages = pages;
        section.hidden_pages = hidden_pages;
        section.section_pages = section_pages;
    }
}

fn link_in_sections(part: &mut Partition) {
    for i in 0..part.sections.len() {
        let ids = part.sections[i].pages.clone();
        for (n, &id) in ids.iter().enumerate() {
            let page = &mut part.pages[id.index()];
            page.prev_in_section = n.checked_sub(1).map(|p| ids[p]);
            page.next_in_section = ids.get(n + 1).copied();
        }
    }
}

fn link_global(part: &mut Partition) {
    let mut ids: Vec<PageId> = part
        .page_ids()
        .filter(|&id| part.page(id).is_listed())
        .collect();
    sort_pages(part, &mut ids, &OrderBy::parse(GLOBAL_ORDER));

    for (n, &id) in ids.iter().enumerate() {
        let page = &mut part.pages[id.index()];
        page.prev = n.checked_sub(1).map(|p| ids[p]);
        page.next = ids.get(n + 1).copied();
    }
}

fn sort_terms(part: &mut Partition) {
    for i in 0..part.taxonomies.len() {
        let mut terms = std::mem::take(&mut part.taxonomies[i].terms);
        terms.sort_by(|&a, &b| part.term(a).full.cmp(&part.term(b).full));
        part.taxonomies[i].terms = terms;
    }

    for i in 0..part.terms.len() {
        let order = part.taxonomy(part.terms[i].taxonomy).orderby();
        let mut children = std::mem::take(&mut part.terms[i].children);
        let mut pages = std::mem::take(&mut part.terms[i].pages);

        children.sort_by(|&a, &b| part.term(a).full.cmp(&part.term(b).full));
        sort_pages(part, &mut pages, &order);

        let term = &mut part.terms[i];
        term.children = children;
        term.pages = pages;
    }
}
