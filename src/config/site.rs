//! `[site]` section configuration.
//!
//! Site identity and the languages a build produces.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[site]` section in canopy.toml.
///
/// # Example
/// ```toml
/// [site]
/// title = "My Blog"
/// url = "https://myblog.com"
/// language = "en"
/// languages = ["zh"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    /// Site title, also the root section's title fallback.
    #[serde(default = "defaults::site::title")]
    #[educe(Default = defaults::site::title())]
    pub title: String,

    /// Base URL every permalink is resolved against.
    #[serde(default = "defaults::site::url")]
    #[educe(Default = defaults::site::url())]
    pub url: Option<String>,

    /// Default language. Its outputs live at the output root.
    #[serde(default = "defaults::site::language")]
    #[educe(Default = defaults::site::language())]
    pub language: String,

    /// Additional languages, each rendered under `<output>/<lang>/`.
    #[serde(default = "defaults::site::languages")]
    #[educe(Default = defaults::site::languages())]
    pub languages: Vec<String>,

    /// Free-form site description exposed to templates.
    #[serde(default)]
    pub description: String,
}
