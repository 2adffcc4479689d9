//! The content graph.
//!
//! Pages, sections, taxonomies and terms live in per-language arenas owned by
//! [`Context`]. Entities point at each other through the copyable ids below,
//! never through shared references, so every structural change goes through a
//! `Context` method under its lock.
//!
//! ```text
//! Context ── RwLock ── lang → Partition
//!                              ├── sections: Vec<Section>        (SectionId)
//!                              ├── pages:    Vec<Page>           (PageId)
//!                              ├── taxonomies: Vec<Taxonomy>     (TaxonomyId)
//!                              └── terms:    Vec<TaxonomyTerm>   (TermId)
//! ```

pub mod context;
pub mod page;
pub mod paginate;
pub mod path;
pub mod section;
pub mod sort;
pub mod taxonomy;

pub use context::{Context, ContextError, Partition};
pub use page::{Page, PageKind};
pub use section::Section;
pub use taxonomy::{Taxonomy, TaxonomyDef, TaxonomyTerm};

use crate::config::{SiteConfig, SlugMode};
use serde::Serialize;

// ============================================================================
// Ids
// ============================================================================

macro_rules! define_id {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(u32);

            impl $name {
                #[inline]
                pub(crate) fn new(index: usize) -> Self {
                    Self(u32::try_from(index).unwrap_or(u32::MAX))
                }

                /// Position in the owning partition's list.
                #[inline]
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

define_id! {
    /// Index of a [`Page`] within its language partition.
    PageId,
    /// Index of a [`Section`] within its language partition.
    SectionId,
    /// Index of a [`Taxonomy`] within its language partition.
    TaxonomyId,
    /// Index of a [`TaxonomyTerm`] within its language partition.
    TermId,
}

// ============================================================================
// Shared types
// ============================================================================

/// One extra output of an entity, e.g. an atom feed next to a section listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Format {
    pub name: String,
    pub path: String,
    pub template: String,
}

/// Site-wide settings every assembler needs.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub title: String,
    /// Base url without trailing slash. Empty when unset.
    pub url: String,
    pub default_lang: String,
    pub languages: Vec<String>,
    pub slug: SlugMode,
}

impl SiteInfo {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            title: config.site.title.clone(),
            url: config
                .site
                .url
                .as_deref()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_owned(),
            default_lang: config.site.language.clone(),
            languages: config.languages(),
            slug: config.build.slug.mode,
        }
    }

    /// Prefix an output path with `<lang>/` unless `lang` is the default language.
    pub fn localize(&self, lang: &str, path: &str) -> String {
        if lang == self.default_lang {
            path::normalize(path)
        } else {
            path::normalize(&format!("{lang}/{path}"))
        }
    }

    /// Absolute url of an output path.
    pub fn permalink(&self, path: &str) -> String {
        path::permalink(&self.url, path)
    }

    pub fn is_language(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l == lang)
    }
}

#[cfg(test)]
pub(crate) fn test_site() -> SiteInfo {
    SiteInfo {
        title: "Test Site".into(),
        url: "https://example.com".into(),
        default_lang: "en".into(),
        languages: vec!["en".into(), "zh".into()],
        slug: SlugMode::On,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_info_from_config() {
        let config =
            SiteConfig::from_str("[site]\nurl = \"https://a.org/\"\nlanguages = [\"fr\"]").unwrap();
        let site = SiteInfo::new(&config);
        assert_eq!(site.url, "https://a.org");
        assert_eq!(site.languages, vec!["en", "fr"]);
        assert!(site.is_language("fr"));
        assert!(!site.is_language("de"));
    }

    #[test]
    fn test_localize() {
        let site = test_site();
        assert_eq!(site.localize("en", "posts/a.html"), "posts/a.html");
        assert_eq!(site.localize("zh", "posts/a.html"), "zh/posts/a.html");
        assert_eq!(site.localize("zh", "index.html"), "zh/index.html");
    }

    #[test]
    fn test_id_index() {
        assert_eq!(PageId::new(7).index(), 7);
        assert!(TermId::new(1) < TermId::new(2));
    }
}
