//! Site configuration management for `canopy.toml`.
//!
//! # Sections
//!
//! | Section          | Purpose                                           |
//! |------------------|---------------------------------------------------|
//! | `[site]`         | Site identity, base url, languages                |
//! | `[build]`        | Paths, pool sizes, hook chain, slug mode          |
//! | `[sections.*]`   | Section metadata by real name (`_default` = root) |
//! | `[taxonomies.*]` | Taxonomy kinds and their output settings          |
//! | `[extra]`        | User-defined custom fields                        |
//!
//! # Example
//!
//! ```toml
//! [site]
//! title = "My Blog"
//! url = "https://example.com"
//!
//! [build]
//! hooks = ["draft", "scheduled"]
//!
//! [sections._default]
//! page_path = "{date:%Y}/{slug}.html"
//!
//! [sections."posts.linux"]
//! paginate = 5
//!
//! [taxonomies.tags]
//! term_orderby = "count desc"
//!
//! [taxonomies.archives]
//! key = "@date:%Y/%m"
//! ```

mod build;
pub mod defaults;
mod error;
mod site;

pub use build::SlugMode;
pub use error::ConfigError;

use build::BuildConfig;
use site::SiteSection;

use crate::cli::{Cli, Commands};
use crate::meta::Meta;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

/// Key of the `[sections]` table that seeds the root section.
pub const DEFAULT_SECTION: &str = "_default";

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing canopy.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Site identity
    #[serde(default)]
    pub site: SiteSection,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Section metadata keyed by section real name
    #[serde(default)]
    pub sections: BTreeMap<String, toml::Table>,

    /// Taxonomy kinds keyed by name
    #[serde(default = "defaults::taxonomies")]
    #[educe(Default = defaults::taxonomies())]
    pub taxonomies: BTreeMap<String, toml::Table>,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: HashMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Languages to build, default language first, duplicates removed.
    pub fn languages(&self) -> Vec<String> {
        let mut langs = vec![self.site.language.clone()];
        for lang in &self.site.languages {
            if !langs.contains(lang) {
                langs.push(lang.clone());
            }
        }
        langs
    }

    /// Metadata seeded into the root section (`[sections._default]`).
    pub fn section_defaults(&self) -> Meta {
        self.sections
            .get(DEFAULT_SECTION)
            .map(Meta::from_toml)
            .unwrap_or_default()
    }

    /// Configured metadata for the section with this real name.
    pub fn section_meta(&self, real_name: &str) -> Option<Meta> {
        if real_name.is_empty() || real_name == DEFAULT_SECTION {
            return None;
        }
        self.sections.get(real_name).map(Meta::from_toml)
    }

    /// `(name, metadata)` for each configured taxonomy, in name order.
    pub fn taxonomies_meta(&self) -> Vec<(String, Meta)> {
        self.taxonomies
            .iter()
            .map(|(name, table)| (name.clone(), Meta::from_toml(table)))
            .collect()
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        Self::update_option(&mut self.build.content, cli.content.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        if let Commands::Build { clean: true } = cli.command {
            self.build.clean = true;
        }

        self.update_path_with_root(&root);
        self.config_path = Self::normalize_path(&root.join(&cli.config));
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve all directory paths against the root and make them absolute
    pub fn update_path_with_root(&mut self, root: &Path) {
        let root = Self::normalize_path(&Self::expand(root));
        self.set_root(&root);

        self.build.content = Self::normalize_path(&root.join(Self::expand(&self.build.content)));
        self.build.output = Self::normalize_path(&root.join(Self::expand(&self.build.output)));
        self.build.templates =
            Self::normalize_path(&root.join(Self::expand(&self.build.templates)));
    }

    /// Expand a leading `~` in a configured path
    fn expand(path: &Path) -> PathBuf {
        match path.to_str() {
            Some(text) => PathBuf::from(shellexpand::tilde(text).into_owned()),
            None => path.to_path_buf(),
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before a build
    pub fn validate(&self) -> Result<()> {
        if self.build.parse_workers == 0 {
            bail!(ConfigError::invalid("build.parse_workers", "must be greater than 0"));
        }
        if self.build.write_workers == 0 {
            bail!(ConfigError::invalid("build.write_workers", "must be greater than 0"));
        }

        if let Some(url) = &self.site.url
            && !url.starts_with("http")
        {
            bail!(ConfigError::invalid("site.url", "must start with http:// or https://"));
        }

        if self.languages().iter().any(|lang| lang.trim().is_empty()) {
            bail!(ConfigError::invalid("site.languages", "must not contain an empty language"));
        }

        for (name, table) in &self.taxonomies {
            if name.trim().is_empty() {
                bail!(ConfigError::invalid("taxonomies", "names must not be empty"));
            }
            if let Some(toml::Value::String(key)) = table.get("key")
                && key.starts_with('@')
                && !(key == "@section" || key.starts_with("@date:"))
            {
                bail!(ConfigError::invalid(
                    format!("taxonomies.{name}.key"),
                    format!("`{key}` is not a known derived key"),
                ));
            }
        }

        Ok(())
    }
}
