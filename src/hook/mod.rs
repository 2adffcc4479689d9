//! Hook chain: pluggable interceptors that mutate or veto entities.
//!
//! Hooks act at two granularities:
//!
//! - **per entity** (`page`, `section`) while the graph is being built,
//!   before insertion. `None` drops the entity.
//! - **per list** (`pages`, `sections`, `taxonomies`, `terms`) right before
//!   the write phase. An empty list drops the whole listing.
//!
//! In both cases the chain stops at the first veto; later hooks never see
//! the item.
//!
//! Hooks are linked statically and selected by name from a [`HookRegistry`]
//! built by the caller.

mod builtin;

pub use builtin::{DraftHook, PruneEmptyHook, ScheduledHook};

use crate::content::{Page, Section, Taxonomy, TaxonomyTerm};
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("unknown hook `{0}` (available: {1})")]
    Unknown(String, String),
}

/// One interceptor. Every method defaults to passing its input through.
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    fn page(&self, page: Page) -> Option<Page> {
        Some(page)
    }

    fn section(&self, section: Section) -> Option<Section> {
        Some(section)
    }

    fn pages(&self, pages: Vec<Page>) -> Vec<Page> {
        pages
    }

    fn sections(&self, sections: Vec<Section>) -> Vec<Section> {
        sections
    }

    fn taxonomies(&self, taxonomies: Vec<Taxonomy>) -> Vec<Taxonomy> {
        taxonomies
    }

    fn terms(&self, terms: Vec<TaxonomyTerm>) -> Vec<TaxonomyTerm> {
        terms
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Ordered hooks applied with short-circuit semantics.
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<Box<dyn Hook>>,
}

impl HookChain {
    pub fn new(hooks: Vec<Box<dyn Hook>>) -> Self {
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    pub fn page(&self, page: Page) -> Option<Page> {
        self.hooks.iter().try_fold(page, |page, hook| hook.page(page))
    }

    pub fn section(&self, section: Section) -> Option<Section> {
        self.hooks
            .iter()
            .try_fold(section, |section, hook| hook.section(section))
    }

    pub fn pages(&self, pages: Vec<Page>) -> Vec<Page> {
        self.apply_list(pages, |hook, list| hook.pages(list))
    }

    pub fn sections(&self, sections: Vec<Section>) -> Vec<Section> {
        self.apply_list(sections, |hook, list| hook.sections(list))
    }

    pub fn taxonomies(&self, taxonomies: Vec<Taxonomy>) -> Vec<Taxonomy> {
        self.apply_list(taxonomies, |hook, list| hook.taxonomies(list))
    }

    pub fn terms(&self, terms: Vec<TaxonomyTerm>) -> Vec<TaxonomyTerm> {
        self.apply_list(terms, |hook, list| hook.terms(list))
    }

    fn apply_list<T>(&self, mut list: Vec<T>, apply: impl Fn(&dyn Hook, Vec<T>) -> Vec<T>) -> Vec<T> {
        for hook in &self.hooks {
            if list.is_empty() {
                break;
            }
            list = apply(hook.as_ref(), list);
        }
        list
    }
}

// ============================================================================
// Registry
// ============================================================================

type HookFactory = Box<dyn Fn() -> Box<dyn Hook> + Send + Sync>;

/// Named hook factories. Build one, register hooks, then select a chain by name.
#[derive(Default)]
pub struct HookRegistry {
    factories: FxHashMap<String, HookFactory>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `draft`, `scheduled` and `prune_empty`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("draft", || Box::new(DraftHook));
        registry.register("scheduled", || Box::new(ScheduledHook::default()));
        registry.register("prune_empty", || Box::new(PruneEmptyHook));
        registry
    }

    /// Register (or replace) a factory under `name`.
    pub fn register(&mut self, name: &str, factory: impl Fn() -> Box<dyn Hook> + Send + Sync + 'static) {
        self.factories.insert(name.to_owned(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate the hooks named in `names`, in order.
    pub fn chain<S: AsRef<str>>(&self, names: &[S]) -> Result<HookChain, HookError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.factories.get(name).map(|make| make()).ok_or_else(|| {
                    let mut known: Vec<_> = self.factories.keys().map(String::as_str).collect();
                    known.sort_unstable();
                    HookError::Unknown(name.to_owned(), known.join(", "))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(HookChain::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::page::tests::page_at;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    /// Counts calls; vetoes when `veto` is set.
    struct Probe {
        calls: Arc<AtomicUsize>,
        veto: bool,
    }

    impl Hook for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn page(&self, mut page: Page) -> Option<Page> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            page.title.push('!');
            (!self.veto).then_some(page)
        }

        fn pages(&self, pages: Vec<Page>) -> Vec<Page> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.veto { Vec::new() } else { pages }
        }
    }

    fn probe(veto: bool) -> (Box<dyn Hook>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook = Box::new(Probe {
            calls: Arc::clone(&calls),
            veto,
        });
        (hook, calls)
    }

    #[test]
    fn test_page_short_circuit() {
        let (h1, first) = probe(true);
        let (h2, second) = probe(false);
        let chain = HookChain::new(vec![h1, h2]);

        assert!(chain.page(page_at("a.md", "A", "2024-01-01")).is_none());
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_page_threads_through_all() {
        let (h1, first) = probe(false);
        let (h2, second) = probe(false);
        let chain = HookChain::new(vec![h1, h2]);

        let page = chain.page(page_at("a.md", "A", "2024-01-01")).unwrap();
        assert_eq!(page.title, "A!!");
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_list_short_circuit() {
        let (h1, first) = probe(true);
        let (h2, second) = probe(false);
        let chain = HookChain::new(vec![h1, h2]);

        let pages = chain.pages(vec![page_at("a.md", "A", "2024-01-01")]);
        assert!(pages.is_empty());
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let chain = HookChain::default();
        assert!(chain.is_empty());
        assert!(chain.page(page_at("a.md", "A", "2024-01-01")).is_some());
        assert_eq!(chain.pages(vec![page_at("a.md", "A", "2024-01-01")]).len(), 1);
    }

    #[test]
    fn test_registry_chain() {
        let registry = HookRegistry::builtin();
        let chain = registry.chain(&["scheduled", "draft"]).unwrap();
        assert_eq!(chain.names(), vec!["scheduled", "draft"]);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_registry_unknown_hook() {
        let registry = HookRegistry::builtin();
        let err = registry.chain(&["draft", "nope"]).err().unwrap();
        let message = err.to_string();
        assert!(message.contains("nope"));
        assert!(message.contains("draft, prune_empty, scheduled"));
    }

    #[test]
    fn test_registry_custom_hook() {
        let mut registry = HookRegistry::new();
        registry.register("probe", || probe(true).0);
        assert!(registry.contains("probe"));

        let chain = registry.chain(&["probe"]).unwrap();
        assert!(chain.page(page_at("a.md", "A", "2024-01-01")).is_none());
    }
}
