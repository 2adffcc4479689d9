//! The thread-safe content registry.
//!
//! One [`parking_lot::RwLock`] guards every language partition. Parse workers
//! take the write lock for inserts and the read lock for lookups; no I/O ever
//! happens while it is held.
//!
//! # Atomic sequences
//!
//! | Operation                | Done under one write lock                          |
//! |--------------------------|----------------------------------------------------|
//! | `insert_page`            | append page, index id, append to section list     |
//! | `insert_section`         | append section, index key, append to parent       |
//! | `thread_page_into_terms` | lookup-or-create each prefix, link child, join    |
//!
//! Prev/next links and listing order are not computed here; see
//! `builder::finalize`.

use super::{
    Page, PageId, PageKind, Section, SectionId, Taxonomy, TaxonomyId, TaxonomyTerm, TermId,
    taxonomy::Prefixes,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("[{0}] page `{1}` already exists")]
    DuplicatePage(String, String),

    #[error("[{0}] section `{1}` already exists")]
    DuplicateSection(String, String),

    #[error("[{0}] parent of section `{1}` does not exist")]
    MissingParent(String, String),

    #[error("[{0}] owning section of page `{1}` does not exist")]
    MissingSection(String, String),
}

// ============================================================================
// Partition
// ============================================================================

/// All entities of one language.
#[derive(Debug, Default)]
pub struct Partition {
    pub(crate) pages: Vec<Page>,
    pub(crate) sections: Vec<Section>,
    pub(crate) taxonomies: Vec<Taxonomy>,
    pub(crate) terms: Vec<TaxonomyTerm>,
    page_index: FxHashMap<String, PageId>,
    section_index: FxHashMap<String, SectionId>,
    taxonomy_index: FxHashMap<String, TaxonomyId>,
    /// Term identity: the slugified path, which also fixes the output path.
    term_index: FxHashMap<(TaxonomyId, String), TermId>,
    /// Every spelling of `full` seen so far.
    term_spellings: FxHashMap<(TaxonomyId, String), TermId>,
}

impl Partition {
    /// Pages in insertion order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Sections in insertion order; the root comes first.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn taxonomies(&self) -> &[Taxonomy] {
        &self.taxonomies
    }

    pub fn terms(&self) -> &[TaxonomyTerm] {
        &self.terms
    }

    pub fn page(&self, id: PageId) -> &Page {
        &self.pages[id.index()]
    }

    pub fn section(&self, id: SectionId) -> &Section {
        &self.sections[id.index()]
    }

    pub fn taxonomy(&self, id: TaxonomyId) -> &Taxonomy {
        &self.taxonomies[id.index()]
    }

    pub fn term(&self, id: TermId) -> &TaxonomyTerm {
        &self.terms[id.index()]
    }

    pub fn page_ids(&self) -> impl Iterator<Item = PageId> + '_ {
        (0..self.pages.len()).map(PageId::new)
    }

    pub fn section_ids(&self) -> impl Iterator<Item = SectionId> + '_ {
        (0..self.sections.len()).map(SectionId::new)
    }

    pub fn taxonomy_ids(&self) -> impl Iterator<Item = TaxonomyId> + '_ {
        (0..self.taxonomies.len()).map(TaxonomyId::new)
    }

    pub fn term_ids(&self) -> impl Iterator<Item = TermId> + '_ {
        (0..self.terms.len()).map(TermId::new)
    }

    pub fn root(&self) -> Option<SectionId> {
        self.find_section("")
    }

    pub fn find_page(&self, id: &str) -> Option<PageId> {
        self.page_index.get(id).copied()
    }

    pub fn find_section(&self, key: &str) -> Option<SectionId> {
        self.section_index.get(key).copied()
    }

    pub fn find_taxonomy(&self, name: &str) -> Option<TaxonomyId> {
        self.taxonomy_index.get(name).copied()
    }

    pub fn find_term(&self, taxonomy: TaxonomyId, full: &str) -> Option<TermId> {
        self.term_spellings.get(&(taxonomy, full.to_owned())).copied()
    }

    /// Terms of a taxonomy, top-level first, each followed by its descendants.
    pub fn taxonomy_terms(&self, taxonomy: TaxonomyId) -> Vec<TermId> {
        let mut out = Vec::new();
        let mut stack: Vec<TermId> = self.taxonomy(taxonomy).terms.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.term(id).children.iter().rev().copied());
        }
        out
    }

    /// Listed pages of a section and all of its descendants.
    pub fn subtree_pages(&self, section: SectionId) -> Vec<PageId> {
        let mut out = Vec::new();
        let mut stack = vec![section];
        while let Some(id) = stack.pop() {
            let section = self.section(id);
            out.extend(
                section
                    .pages
                    .iter()
                    .copied()
                    .filter(|&p| self.page(p).is_listed()),
            );
            stack.extend(section.children.iter().copied());
        }
        out
    }

    fn insert_page(&mut self, lang: &str, page: Page) -> Result<PageId, ContextError> {
        if self.page_index.contains_key(&page.id) {
            return Err(ContextError::DuplicatePage(lang.to_owned(), page.id));
        }
        if page.section.index() >= self.sections.len() {
            return Err(ContextError::MissingSection(lang.to_owned(), page.id));
        }

        let id = PageId::new(self.pages.len());
        let section = &mut self.sections[page.section.index()];
        match page.kind {
            PageKind::Normal => section.pages.push(id),
            PageKind::Hidden => section.hidden_pages.push(id),
            PageKind::SectionPage => section.section_pages.push(id),
        }
        self.page_index.insert(page.id.clone(), id);
        self.pages.push(page);
        Ok(id)
    }

    fn insert_section(&mut self, lang: &str, section: Section) -> Result<SectionId, ContextError> {
        if self.section_index.contains_key(&section.key) {
            return Err(ContextError::DuplicateSection(lang.to_owned(), section.key));
        }
        if section.parent.is_some_and(|p| p.index() >= self.sections.len()) {
            return Err(ContextError::MissingParent(lang.to_owned(), section.key));
        }

        let id = SectionId::new(self.sections.len());
        if let Some(parent) = section.parent {
            push_unique(&mut self.sections[parent.index()].children, id);
        }
        self.section_index.insert(section.key.clone(), id);
        self.sections.push(section);
        Ok(id)
    }

    fn insert_taxonomy(&mut self, taxonomy: Taxonomy) -> TaxonomyId {
        if let Some(id) = self.find_taxonomy(&taxonomy.name) {
            return id;
        }
        let id = TaxonomyId::new(self.taxonomies.len());
        self.taxonomy_index.insert(taxonomy.name.clone(), id);
        self.taxonomies.push(taxonomy);
        id
    }

    /// Find-or-insert a term by slug and link it under its parent or taxonomy.
    ///
    /// Spellings that share a slug (`Rust`, `rust`) share one term, which
    /// keeps the smallest spelling so the result does not depend on
    /// insertion order.
    fn insert_term(&mut self, term: TaxonomyTerm) -> TermId {
        let spelling = (term.taxonomy, term.full.clone());
        if let Some(&id) = self.term_spellings.get(&spelling) {
            return id;
        }

        let key = (term.taxonomy, term_key(&term).to_owned());
        if let Some(&id) = self.term_index.get(&key) {
            self.term_spellings.insert(spelling, id);
            let stored = &mut self.terms[id.index()];
            if term.full < stored.full {
                let old = std::mem::replace(stored, term);
                stored.taxonomy = old.taxonomy;
                stored.parent = old.parent;
                stored.pages = old.pages;
                stored.children = old.children;
            }
            return id;
        }

        let id = TermId::new(self.terms.len());
        match term.parent {
            Some(parent) => push_unique(&mut self.terms[parent.index()].children, id),
            None => push_unique(&mut self.taxonomies[term.taxonomy.index()].terms, id),
        }
        self.term_index.insert(key, id);
        self.term_spellings.insert(spelling, id);
        self.terms.push(term);
        id
    }
}

/// A term whose path slugifies to nothing keeps its own spelling as identity.
fn term_key(term: &TaxonomyTerm) -> &str {
    if term.slug.is_empty() {
        &term.full
    } else {
        &term.slug
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

// ============================================================================
// Context
// ============================================================================

/// Per-language content registry shared by every worker.
#[derive(Debug, Default)]
pub struct Context {
    registry: RwLock<FxHashMap<String, Partition>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a page and append it to its section's list for its kind.
    pub fn insert_page(&self, lang: &str, page: Page) -> Result<PageId, ContextError> {
        self.registry
            .write()
            .entry(lang.to_owned())
            .or_default()
            .insert_page(lang, page)
    }

    /// Insert a section and append it to its parent's children.
    pub fn insert_section(&self, lang: &str, section: Section) -> Result<SectionId, ContextError> {
        self.registry
            .write()
            .entry(lang.to_owned())
            .or_default()
            .insert_section(lang, section)
    }

    /// Insert a taxonomy unless one with the same name exists; returns the stored id.
    pub fn insert_taxonomy(&self, lang: &str, taxonomy: Taxonomy) -> TaxonomyId {
        self.registry
            .write()
            .entry(lang.to_owned())
            .or_default()
            .insert_taxonomy(taxonomy)
    }

    /// Insert a term unless `(taxonomy, full)` exists; returns the stored id.
    ///
    /// # Panics
    /// If `term.taxonomy` or `term.parent` does not exist in `lang`.
    pub fn insert_taxonomy_term(&self, lang: &str, term: TaxonomyTerm) -> TermId {
        self.registry
            .write()
            .entry(lang.to_owned())
            .or_default()
            .insert_term(term)
    }

    /// Walk every prefix chain of one page under a single write lock: find or
    /// create each term, link new terms under their parent, and add the page
    /// to every term on the way exactly once.
    ///
    /// Returns the terms the page joined.
    pub fn thread_page_into_terms(
        &self,
        lang: &str,
        taxonomy: TaxonomyId,
        page: PageId,
        chains: &[Prefixes],
        make_term: impl Fn(&str) -> TaxonomyTerm,
    ) -> SmallVec<[TermId; 8]> {
        let mut registry = self.registry.write();
        let partition = registry.entry(lang.to_owned()).or_default();
        let mut joined: SmallVec<[TermId; 8]> = SmallVec::new();

        for chain in chains {
            let mut parent = None;
            for full in chain {
                let id = match partition.find_term(taxonomy, full) {
                    Some(id) => id,
                    None => {
                        let mut term = make_term(full);
                        term.taxonomy = taxonomy;
                        term.parent = parent;
                        partition.insert_term(term)
                    }
                };
                if !joined.contains(&id) {
                    partition.terms[id.index()].pages.push(page);
                    joined.push(id);
                }
                parent = Some(id);
            }
        }
        joined
    }

    pub fn find_page(&self, lang: &str, id: &str) -> Option<PageId> {
        self.registry.read().get(lang)?.find_page(id)
    }

    pub fn find_section(&self, lang: &str, key: &str) -> Option<SectionId> {
        self.registry.read().get(lang)?.find_section(key)
    }

    pub fn find_taxonomy(&self, lang: &str, name: &str) -> Option<TaxonomyId> {
        self.registry.read().get(lang)?.find_taxonomy(name)
    }

    pub fn find_taxonomy_term(&self, lang: &str, taxonomy: TaxonomyId, full: &str) -> Option<TermId> {
        self.registry.read().get(lang)?.find_term(taxonomy, full)
    }

    pub fn page(&self, lang: &str, id: PageId) -> Option<Page> {
        self.registry.read().get(lang)?.pages.get(id.index()).cloned()
    }

    pub fn section(&self, lang: &str, id: SectionId) -> Option<Section> {
        self.registry.read().get(lang)?.sections.get(id.index()).cloned()
    }

    pub fn taxonomy(&self, lang: &str, id: TaxonomyId) -> Option<Taxonomy> {
        self.registry.read().get(lang)?.taxonomies.get(id.index()).cloned()
    }

    pub fn term(&self, lang: &str, id: TermId) -> Option<TaxonomyTerm> {
        self.registry.read().get(lang)?.terms.get(id.index()).cloned()
    }

    /// Record a reader-less file against a section.
    pub fn add_section_asset(&self, lang: &str, section: SectionId, asset: String) {
        let mut registry = self.registry.write();
        if let Some(section) = registry
            .get_mut(lang)
            .and_then(|p| p.sections.get_mut(section.index()))
        {
            section.assets.push(asset);
        }
    }

    /// Run a composite read under the shared lock. `None` if `lang` has no content.
    pub fn read<R>(&self, lang: &str, f: impl FnOnce(&Partition) -> R) -> Option<R> {
        self.registry.read().get(lang).map(f)
    }

    /// Run a single-threaded pass under the exclusive lock.
    pub(crate) fn write<R>(&self, lang: &str, f: impl FnOnce(&mut Partition) -> R) -> R {
        f(self.registry.write().entry(lang.to_owned()).or_default())
    }

    /// Languages with at least one entity, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut langs: Vec<_> = self.registry.read().keys().cloned().collect();
        langs.sort();
        langs
    }
}
