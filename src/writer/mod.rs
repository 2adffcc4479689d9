//! Render jobs and the writer interface.
//!
//! The dispatcher turns the finished graph into [`RenderJob`]s: a template
//! name, an output path and a variable map. A [`Writer`] renders one job.
//! A missing template is reported as [`RenderError::TemplateNotFound`] and
//! skipped silently; every other failure is logged for that job only.

mod data;
pub mod vars;

pub use data::DataWriter;

use crate::content::{Context, Page, Section, Taxonomy, TaxonomyTerm};
use serde_json::Value;
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template `{0}` not found")]
    TemplateNotFound(String),

    #[error("output path `{0}` leaves the output directory")]
    OutsideOutput(String),

    #[error("IO error when writing `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to serialize variables")]
    Serialize(#[from] serde_json::Error),
}

/// One output file.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub lang: String,
    pub template: String,
    /// Output path relative to the output root.
    pub path: String,
    pub vars: Value,
}

/// Renders jobs into files.
pub trait Writer: Send + Sync {
    fn write(&self, job: &RenderJob, lookup: &Lookup) -> Result<(), RenderError>;
}

/// Cross-reference lookups available while rendering, backed by shared-lock
/// reads of the context.
#[derive(Debug, Clone)]
pub struct Lookup {
    ctx: Arc<Context>,
    lang: String,
}

impl Lookup {
    pub fn new(ctx: Arc<Context>, lang: &str) -> Self {
        Self {
            ctx,
            lang: lang.to_owned(),
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Page by source path, e.g. `posts/hello.md`.
    pub fn page(&self, id: &str) -> Option<Page> {
        self.ctx
            .read(&self.lang, |p| p.find_page(id).map(|id| p.page(id).clone()))
            .flatten()
    }

    /// Section by directory path, `""` for the root.
    pub fn section(&self, key: &str) -> Option<Section> {
        self.ctx
            .read(&self.lang, |p| p.find_section(key).map(|id| p.section(id).clone()))
            .flatten()
    }

    pub fn taxonomy(&self, name: &str) -> Option<Taxonomy> {
        self.ctx
            .read(&self.lang, |p| p.find_taxonomy(name).map(|id| p.taxonomy(id).clone()))
            .flatten()
    }

    /// Term by taxonomy name and full path, e.g. `("tags", "linux/emacs")`.
    pub fn term(&self, taxonomy: &str, full: &str) -> Option<TaxonomyTerm> {
        self.ctx
            .read(&self.lang, |p| {
                let taxonomy = p.find_taxonomy(taxonomy)?;
                p.find_term(taxonomy, full).map(|id| p.term(id).clone())
            })
            .flatten()
    }
}
