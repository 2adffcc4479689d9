//! Hooks shipped with canopy.
//!
//! | Name          | Effect                                                 |
//! |---------------|--------------------------------------------------------|
//! | `draft`       | drops pages with `draft = true` or `status = "draft"`  |
//! | `scheduled`   | drops pages dated in the future                        |
//! | `prune_empty` | drops empty sections and terms from the write lists    |

use super::Hook;
use crate::{
    content::{Page, Section, TaxonomyTerm},
    utils,
};
use chrono::NaiveDateTime;

pub struct DraftHook;

impl Hook for DraftHook {
    fn name(&self) -> &str {
        "draft"
    }

    fn page(&self, page: Page) -> Option<Page> {
        let draft = page.meta.get_bool("draft")
            || page.meta.get_str("status").as_deref() == Some("draft");
        (!draft).then_some(page)
    }
}

/// Drops pages dated after `now`, fixed when the hook is created.
pub struct ScheduledHook {
    now: NaiveDateTime,
}

impl ScheduledHook {
    pub fn at(now: NaiveDateTime) -> Self {
        Self { now }
    }
}

impl Default for ScheduledHook {
    fn default() -> Self {
        Self::at(utils::date::now())
    }
}

impl Hook for ScheduledHook {
    fn name(&self) -> &str {
        "scheduled"
    }

    fn page(&self, page: Page) -> Option<Page> {
        (page.date <= self.now).then_some(page)
    }
}

pub struct PruneEmptyHook;

impl Hook for PruneEmptyHook {
    fn name(&self) -> &str {
        "prune_empty"
    }

    fn sections(&self, sections: Vec<Section>) -> Vec<Section> {
        sections
            .into_iter()
            .filter(|s| !(s.pages.is_empty() && s.section_pages.is_empty() && s.children.is_empty()))
            .collect()
    }

    fn terms(&self, terms: Vec<TaxonomyTerm>) -> Vec<TaxonomyTerm> {
        terms
            .into_iter()
            .filter(|t| !(t.pages.is_empty() && t.children.is_empty()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{
        SectionId, page::tests::page_at, section::tests::test_section,
    };
    use serde_json::json;

    #[test]
    fn test_draft() {
        let mut draft = page_at("a.md", "A", "2024-01-01");
        draft.meta.insert("draft", json!(true));
        assert!(DraftHook.page(draft).is_none());

        let mut status = page_at("b.md", "B", "2024-01-01");
        status.meta.insert("status", json!("draft"));
        assert!(DraftHook.page(status).is_none());

        assert!(DraftHook.page(page_at("c.md", "C", "2024-01-01")).is_some());
    }

    #[test]
    fn test_scheduled() {
        let hook = ScheduledHook::at(utils::date::parse("2024-06-01").unwrap());
        assert!(hook.page(page_at("a.md", "A", "2024-05-31")).is_some());
        assert!(hook.page(page_at("b.md", "B", "2024-06-01")).is_some());
        assert!(hook.page(page_at("c.md", "C", "2024-06-02")).is_none());
    }

    #[test]
    fn test_prune_empty_sections() {
        let empty = test_section("empty");
        let mut parent = test_section("parent");
        parent.children.push(SectionId::new(3));

        let kept = PruneEmptyHook.sections(vec![empty, parent]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].key, "parent");
    }
}
