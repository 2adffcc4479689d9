//! Build orchestration.
//!
//! # Architecture
//!
//! ```text
//! Builder::build()
//!     │
//!     ├── for each language
//!     │       ├── walk::walk()      sections inline, pages ──► parse pool
//!     │       ├── parse.wait()
//!     │       └── finalize()        sorts + sibling links
//!     │
//!     ├── for each language
//!     │       └── dispatch::jobs()  hook-filtered lists ──► RenderJob
//!     │
//!     └── write pool ◄── jobs; write.wait()
//! ```
//!
//! Only structural failures abort a build: a missing content root, an
//! unreadable root directory, a pool that cannot start. Everything else is
//! logged and counted in [`BuildReport`].

mod dispatch;
mod finalize;
mod walk;

pub use finalize::finalize;

use crate::{
    config::SiteConfig,
    content::{
        Context, PageKind, SiteInfo, TaxonomyDef,
        page::{self, PageSource},
        taxonomy,
    },
    hook::HookChain,
    log,
    logger::ProgressBars,
    meta::Meta,
    pool::TaskPool,
    reader::{MetaCache, ReaderRegistry},
    writer::{Lookup, RenderError, RenderJob, Writer},
};
use anyhow::{Context as _, Result, bail};
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};
use walk::ParseTask;

// ============================================================================
// Report
// ============================================================================

/// Per-item outcomes, updated from worker threads.
#[derive(Debug, Default)]
struct BuildStats {
    skipped: AtomicUsize,
    dropped: AtomicUsize,
    written: AtomicUsize,
    missing_templates: AtomicUsize,
    failed: AtomicUsize,
}

impl BuildStats {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Summary of one build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub languages: usize,
    pub pages: usize,
    pub sections: usize,
    pub taxonomies: usize,
    pub terms: usize,
    /// Source files that could not be read or inserted.
    pub skipped: usize,
    /// Pages and sections vetoed by hooks.
    pub dropped: usize,
    pub written: usize,
    /// Render jobs skipped because their template does not exist.
    pub missing_templates: usize,
    /// Render jobs that failed.
    pub failed: usize,
}

/// The finished graph and what it took to build it.
#[derive(Debug)]
pub struct BuildOutput {
    pub context: Arc<Context>,
    pub report: BuildReport,
}

// ============================================================================
// Environment
// ============================================================================

/// Shared, read-only state of one build run, plus the graph being built.
struct BuildEnv {
    site: SiteInfo,
    content: PathBuf,
    readers: ReaderRegistry,
    hooks: Arc<HookChain>,
    taxonomies: Vec<TaxonomyDef>,
    /// `[sections._default]`
    section_defaults: Meta,
    /// `[sections."<real name>"]`
    sections: FxHashMap<String, Meta>,
    ctx: Arc<Context>,
    cache: MetaCache,
    stats: BuildStats,
}

impl BuildEnv {
    fn report(&self) -> BuildReport {
        let mut report = BuildReport {
            languages: self.ctx.languages().len(),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
            written: self.stats.written.load(Ordering::Relaxed),
            missing_templates: self.stats.missing_templates.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            ..BuildReport::default()
        };
        for lang in self.ctx.languages() {
            self.ctx.read(&lang, |part| {
                report.pages += part.pages().len();
                report.sections += part.sections().len();
                report.taxonomies += part.taxonomies().len();
                report.terms += part.terms().len();
            });
        }
        report
    }
}

/// Parse one file into a page and thread it into the graph.
fn parse(env: &BuildEnv, task: ParseTask) {
    let file_meta = match env.cache.get_or_read(&task.path, &env.readers) {
        Ok(meta) => meta,
        Err(e) => {
            log!("warn"; "skipping {}: {}", task.id, e);
            BuildStats::bump(&env.stats.skipped);
            return;
        }
    };

    let source = PageSource {
        id: &task.id,
        file_name: &task.file_name,
        bundle: task.bundle.as_deref(),
        section: task.owner.id,
        section_key: &task.owner.key,
        section_slug: &task.owner.slug,
        section_meta: &task.owner.meta,
        assets: task.assets,
    };
    let Some(page) = page::assemble(source, &file_meta, &task.lang, &env.site) else {
        return;
    };
    let Some(page) = env.hooks.page(page) else {
        BuildStats::bump(&env.stats.dropped);
        return;
    };

    let listed = page.kind == PageKind::Normal;
    let values: Vec<Vec<String>> = if listed {
        env.taxonomies
            .iter()
            .map(|def| def.values(&page, &task.owner.key))
            .collect()
    } else {
        Vec::new()
    };

    match env.ctx.insert_page(&task.lang, page) {
        Ok(id) if listed => {
            taxonomy::assemble(&env.ctx, &task.lang, id, &values, &env.taxonomies, &env.site);
        }
        Ok(_) => {}
        Err(e) => {
            log!("warn"; "{e}");
            BuildStats::bump(&env.stats.skipped);
        }
    }
}

/// Render one job, counting the outcome.
fn render(env: &BuildEnv, writer: &dyn Writer, job: &RenderJob) {
    let lookup = Lookup::new(Arc::clone(&env.ctx), &job.lang);
    match writer.write(job, &lookup) {
        Ok(()) => BuildStats::bump(&env.stats.written),
        Err(RenderError::TemplateNotFound(_)) => BuildStats::bump(&env.stats.missing_templates),
        Err(e) => {
            log!("error"; "{}: {}", job.path, e);
            BuildStats::bump(&env.stats.failed);
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds the content graph of a site and dispatches it to a [`Writer`].
///
/// Every call to [`Builder::build`] or [`Builder::build_graph`] starts from an
/// empty graph.
pub struct Builder {
    site: SiteInfo,
    content: PathBuf,
    output: PathBuf,
    clean: bool,
    parse_workers: usize,
    write_workers: usize,
    readers: ReaderRegistry,
    hooks: Arc<HookChain>,
    taxonomies: Vec<TaxonomyDef>,
    section_defaults: Meta,
    sections: FxHashMap<String, Meta>,
}

impl Builder {
    pub fn new(config: &SiteConfig, readers: ReaderRegistry, hooks: HookChain) -> Self {
        let sections = config
            .sections
            .keys()
            .filter_map(|name| Some((name.clone(), config.section_meta(name)?)))
            .collect();

        Self {
            site: SiteInfo::new(config),
            content: config.build.content.clone(),
            output: config.build.output.clone(),
            clean: config.build.clean,
            parse_workers: config.build.parse_workers,
            write_workers: config.build.write_workers,
            readers,
            hooks: Arc::new(hooks),
            taxonomies: TaxonomyDef::from_config(config),
            section_defaults: config.section_defaults(),
            sections,
        }
    }

    fn env(&self) -> Arc<BuildEnv> {
        Arc::new(BuildEnv {
            site: self.site.clone(),
            content: self.content.clone(),
            readers: self.readers.clone(),
            hooks: Arc::clone(&self.hooks),
            taxonomies: self.taxonomies.clone(),
            section_defaults: self.section_defaults.clone(),
            sections: self.sections.clone(),
            ctx: Arc::new(Context::new()),
            cache: MetaCache::new(),
            stats: BuildStats::default(),
        })
    }

    /// Build and finalize the graph of every language, without writing.
    pub fn build_graph(&self) -> Result<BuildOutput> {
        let env = self.graph()?;
        Ok(BuildOutput {
            context: Arc::clone(&env.ctx),
            report: env.report(),
        })
    }

    /// Build the graph, then render every entity with `writer`.
    pub fn build(&self, writer: Arc<dyn Writer>) -> Result<BuildOutput> {
        let env = self.graph()?;
        prepare_output(&self.output, self.clean)?;

        let jobs: Vec<RenderJob> = self
            .site
            .languages
            .iter()
            .flat_map(|lang| dispatch::jobs(&env, lang))
            .collect();
        log!("write"; "rendering {} files", jobs.len());

        let progress = Arc::new(ProgressBars::new_filtered(&[("write", jobs.len())]));
        let pool = {
            let env = Arc::clone(&env);
            let progress = Arc::clone(&progress);
            TaskPool::new("write", self.write_workers, move |job: RenderJob| {
                render(&env, writer.as_ref(), &job);
                if let Some(bars) = progress.as_ref() {
                    bars.inc(0);
                }
            })?
        };
        log!(pool.name(); "{} workers", pool.size());
        for job in jobs {
            pool.submit(job)?;
        }
        pool.wait();
        pool.release();
        if let Some(bars) = progress.as_ref() {
            bars.finish();
        }

        let report = env.report();
        log!(
            "build";
            "wrote {} files ({} without template, {} failed)",
            report.written, report.missing_templates, report.failed
        );
        Ok(BuildOutput {
            context: Arc::clone(&env.ctx),
            report,
        })
    }

    fn graph(&self) -> Result<Arc<BuildEnv>> {
        if !self.content.is_dir() {
            bail!("content directory `{}` does not exist", self.content.display());
        }

        let started = Instant::now();
        let env = self.env();
        let pool = {
            let env = Arc::clone(&env);
            TaskPool::new("parse", self.parse_workers, move |task| parse(&env, task))?
        };
        log!(pool.name(); "{} workers", pool.size());

        for lang in &self.site.languages {
            walk::walk(&env, &pool, lang)
                .with_context(|| format!("failed to walk `{}`", self.content.display()))?;
            pool.wait();
            finalize(&env.ctx, lang);
        }
        pool.release();

        let report = env.report();
        log!(
            "build";
            "{} pages, {} sections, {} terms in {:.2?}",
            report.pages, report.sections, report.terms, started.elapsed()
        );
        Ok(env)
    }
}

/// Create the output directory, emptying it first when `clean` is set.
fn prepare_output(output: &Path, clean: bool) -> Result<()> {
    if clean && output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("failed to clean `{}`", output.display()))?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("failed to create `{}`", output.display()))
}
