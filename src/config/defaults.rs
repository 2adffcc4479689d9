//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [site] Section Defaults
// ============================================================================

pub mod site {
    pub fn title() -> String {
        "My Site".into()
    }

    pub fn url() -> Option<String> {
        None
    }

    pub fn language() -> String {
        "en".into()
    }

    pub fn languages() -> Vec<String> {
        Vec::new()
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn content() -> PathBuf {
        "content".into()
    }

    pub fn output() -> PathBuf {
        "public".into()
    }

    pub fn templates() -> PathBuf {
        "templates".into()
    }

    /// Parsing is I/O bound: go wide.
    pub fn parse_workers() -> usize {
        100
    }

    pub fn write_workers() -> usize {
        10
    }

    pub fn hooks() -> Vec<String> {
        vec!["draft".into()]
    }

    pub mod slug {
        use super::super::super::SlugMode;

        pub fn mode() -> SlugMode {
            SlugMode::default()
        }
    }
}

// ============================================================================
// [taxonomies] Defaults
// ============================================================================

pub fn taxonomies() -> std::collections::BTreeMap<String, toml::Table> {
    ["tags", "categories"]
        .into_iter()
        .map(|name| (name.to_owned(), toml::Table::new()))
        .collect()
}
