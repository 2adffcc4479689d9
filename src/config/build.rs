//! `[build]` section configuration.
//!
//! Paths, worker pool sizes, the hook chain and slug behaviour.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Enums
// ============================================================================

/// URL slug generation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugMode {
    /// Always convert to an ASCII slug (e.g., "你好" → "ni-hao").
    On,
    /// Lowercase, drop unsafe characters, keep non-ASCII letters (default).
    #[default]
    Safe,
    /// No slugification; preserve original text.
    No,
}

// ============================================================================
// Main BuildConfig
// ============================================================================

/// `[build]` section in canopy.toml.
///
/// # Example
/// ```toml
/// [build]
/// content = "content"
/// output = "public"
/// parse_workers = 100
/// write_workers = 10
/// hooks = ["draft", "scheduled"]
///
/// [build.slug]
/// mode = "on"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Content source directory.
    #[serde(default = "defaults::build::content")]
    #[educe(Default = defaults::build::content())]
    pub content: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Template directory. When it exists, renders whose template is missing are skipped.
    #[serde(default = "defaults::build::templates")]
    #[educe(Default = defaults::build::templates())]
    pub templates: PathBuf,

    /// Workers in the parse pool.
    #[serde(default = "defaults::build::parse_workers")]
    #[educe(Default = defaults::build::parse_workers())]
    pub parse_workers: usize,

    /// Workers in the write pool.
    #[serde(default = "defaults::build::write_workers")]
    #[educe(Default = defaults::build::write_workers())]
    pub write_workers: usize,

    /// Hook names, applied in order.
    #[serde(default = "defaults::build::hooks")]
    #[educe(Default = defaults::build::hooks())]
    pub hooks: Vec<String>,

    /// Remove the output directory before writing.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,

    /// Slug settings.
    #[serde(default)]
    pub slug: SlugConfig,
}

/// `[build.slug]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SlugConfig {
    #[serde(default = "defaults::build::slug::mode")]
    #[educe(Default = defaults::build::slug::mode())]
    pub mode: SlugMode,
}
