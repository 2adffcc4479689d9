//! Content tree walker.
//!
//! Visits directories depth-first in the calling thread. Sections are built
//! and inserted inline so every page task already knows its owner; pages are
//! handed to the parse pool.
//!
//! ```text
//! ENTER ──► ignored? ──yes──► skip
//!             │no
//!             ▼
//!        index.<ext>? ──yes──► one bundle page, assets, SKIP_SUBTREE
//!             │no
//!             ▼
//!   _index.<ext> or [sections."<name>"]? ──yes──► ASSEMBLE_SECTION (hook may prune)
//!             │
//!             ▼
//!       SCAN_ENTRIES: `.name`/`_index.*` skipped, reader → parse task,
//!                     no reader → section asset, directory → ENTER
//! ```
//!
//! A directory that is neither a bundle nor a section only groups files; its
//! pages belong to the nearest enclosing section.

use super::BuildEnv;
use crate::{
    content::{
        SectionId, SiteInfo,
        page::split_name,
        section::{self, SectionSource},
    },
    log,
    meta::Meta,
    pool::TaskPool,
    reader::ReadError,
};
use anyhow::Result;
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use walkdir::{DirEntry, WalkDir};

const INDEX: &str = "index";
const SECTION_INDEX: &str = "_index";

/// The section that owns the files of a directory.
#[derive(Debug, Clone)]
pub(super) struct Owner {
    pub id: SectionId,
    pub key: String,
    pub slug: String,
    pub meta: Arc<Meta>,
}

/// One page file to parse.
#[derive(Debug)]
pub(super) struct ParseTask {
    pub lang: String,
    pub path: PathBuf,
    /// Source path relative to the content root.
    pub id: String,
    pub file_name: String,
    /// Directory name when the page is a bundle.
    pub bundle: Option<String>,
    pub owner: Owner,
    pub assets: Vec<String>,
}

type Ignores = Arc<Vec<Regex>>;

/// Walk the content root for `lang`. Only a failure to list the root is fatal.
pub(super) fn walk(env: &Arc<BuildEnv>, pool: &TaskPool<ParseTask>, lang: &str) -> Result<()> {
    let walker = Walker { env, pool, lang };
    let root = &env.content;
    let entries = list(root)?;

    let index = walker.section_index(&entries);
    let source = SectionSource {
        key: "",
        parent: None,
        parent_meta: None,
        parent_slug: "",
        defaults: &env.section_defaults,
        configured: None,
        index: index.as_deref(),
    };
    let Some(owner) = walker.insert_section(&source) else {
        return Ok(());
    };

    let ignores = walker.ignores(&Arc::default(), &owner.meta);
    walker.scan(entries, "", &owner, &ignores);
    Ok(())
}

struct Walker<'a> {
    env: &'a Arc<BuildEnv>,
    pool: &'a TaskPool<ParseTask>,
    lang: &'a str,
}

impl Walker<'_> {
    fn enter(&self, dir: &Path, key: &str, owner: &Owner, ignores: &Ignores) {
        let entries = match list(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log!("warn"; "cannot read `{}`: {}", dir.display(), e);
                return;
            }
        };

        if let Some(index) = self.bundle_index(&entries) {
            self.submit_bundle(dir, key, index, owner);
            return;
        }

        let configured = self.env.sections.get(&key.replace('/', "."));
        let index = self.section_index(&entries);
        if configured.is_none() && index.is_none() {
            self.scan(entries, key, owner, ignores);
            return;
        }

        let source = SectionSource {
            key,
            parent: Some(owner.id),
            parent_meta: Some(owner.meta.as_ref()),
            parent_slug: &owner.slug,
            defaults: &self.env.section_defaults,
            configured,
            index: index.as_deref(),
        };
        if let Some(section) = self.insert_section(&source) {
            let ignores = self.ignores(ignores, &section.meta);
            self.scan(entries, key, &section, &ignores);
        }
    }

    fn scan(&self, entries: Vec<DirEntry>, key: &str, owner: &Owner, ignores: &Ignores) {
        for entry in entries {
            let Some(name) = entry.file_name().to_str() else {
                log!("warn"; "skipping non UTF-8 path `{}`", entry.path().display());
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let rel = join(key, name);
            if ignores.iter().any(|re| re.is_match(&rel)) {
                continue;
            }

            if entry.file_type().is_dir() {
                self.enter(entry.path(), &rel, owner, ignores);
            } else if is_named(name, SECTION_INDEX) {
                continue;
            } else if self.env.readers.supports(entry.path()) {
                self.submit(ParseTask {
                    lang: self.lang.to_owned(),
                    path: entry.path().to_path_buf(),
                    id: rel,
                    file_name: name.to_owned(),
                    bundle: None,
                    owner: owner.clone(),
                    assets: Vec::new(),
                });
            } else {
                self.env.ctx.add_section_asset(self.lang, owner.id, rel);
            }
        }
    }

    fn submit(&self, task: ParseTask) {
        if let Err(e) = self.pool.submit(task) {
            log!("error"; "{e}");
        }
    }

    /// Queue a bundle: one page from `index`, every other file an asset.
    fn submit_bundle(&self, dir: &Path, key: &str, index: &DirEntry, owner: &Owner) {
        let assets = WalkDir::new(dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| !(e.depth() == 1 && self.is_content_index(e, INDEX)))
            .filter_map(|e| {
                let rel = e.path().strip_prefix(dir).ok()?;
                Some(rel.to_str()?.replace('\\', "/"))
            })
            .collect();

        let file_name = index.file_name().to_string_lossy().into_owned();
        let bundle = key.rsplit('/').next().unwrap_or(key).to_owned();
        self.submit(ParseTask {
            lang: self.lang.to_owned(),
            path: index.path().to_path_buf(),
            id: join(key, &file_name),
            file_name,
            bundle: Some(bundle),
            owner: owner.clone(),
            assets,
        });
    }

    /// Run the section hook and insert. `None` when vetoed or rejected.
    fn insert_section(&self, source: &SectionSource) -> Option<Owner> {
        let env = self.env;
        let section = section::assemble(source, self.lang, &env.site);
        let Some(section) = env.hooks.section(section) else {
            log!("hook"; "[{}] dropped section `{}`", self.lang, source.key);
            super::BuildStats::bump(&env.stats.dropped);
            return None;
        };

        let owner = Owner {
            id: SectionId::new(0),
            key: section.key.clone(),
            slug: section.slug.clone(),
            meta: Arc::clone(&section.meta),
        };
        match env.ctx.insert_section(self.lang, section) {
            Ok(id) => Some(Owner { id, ..owner }),
            Err(e) => {
                log!("warn"; "{e}");
                super::BuildStats::bump(&env.stats.skipped);
                None
            }
        }
    }

    /// Ancestor patterns plus the section's own `ignore_files`.
    fn ignores(&self, inherited: &Ignores, meta: &Meta) -> Ignores {
        let own = meta.get_list("ignore_files");
        if own.is_empty() {
            return Arc::clone(inherited);
        }

        let mut patterns = inherited.as_ref().clone();
        for pattern in own {
            match Regex::new(&pattern) {
                Ok(re) => patterns.push(re),
                Err(e) => log!("warn"; "invalid ignore pattern `{pattern}`: {e}"),
            }
        }
        Arc::new(patterns)
    }

    /// The bundle marker of a directory: `index.<lang>.<ext>`, else
    /// `index.<ext>`, else any other `index.*` with a reader.
    fn bundle_index<'e>(&self, entries: &'e [DirEntry]) -> Option<&'e DirEntry> {
        let candidates: Vec<&DirEntry> = entries
            .iter()
            .filter(|e| self.is_content_index(e, INDEX))
            .collect();
        pick_localized(&candidates, self.lang, &self.env.site)
    }

    /// Metadata of `_index.<lang>.<ext>`, falling back to `_index.<ext>`.
    /// Empty when the file has none or cannot be parsed.
    fn section_index(&self, entries: &[DirEntry]) -> Option<Arc<Meta>> {
        let candidates: Vec<&DirEntry> = entries
            .iter()
            .filter(|e| self.is_content_index(e, SECTION_INDEX))
            .collect();
        let chosen = pick_localized(&candidates, self.lang, &self.env.site)?;
        let name = chosen.file_name().to_string_lossy();
        let (_, lang) = split_name(&name, &self.env.site);
        if lang.is_some_and(|lang| lang != self.lang) {
            return None;
        }

        // The file's presence makes the section; its metadata is optional.
        match self.env.cache.get_or_read(chosen.path(), &self.env.readers) {
            Ok(meta) => Some(meta),
            Err(ReadError::Empty) => Some(Arc::default()),
            Err(e) => {
                log!("warn"; "ignoring metadata of {}: {}", chosen.path().display(), e);
                Some(Arc::default())
            }
        }
    }

    fn is_content_index(&self, entry: &DirEntry, stem: &str) -> bool {
        entry.file_type().is_file()
            && is_named(&entry.file_name().to_string_lossy(), stem)
            && self.env.readers.supports(entry.path())
    }
}

/// Prefer the `lang` variant, then the plain file, then anything else.
fn pick_localized<'e>(
    candidates: &[&'e DirEntry],
    lang: &str,
    site: &SiteInfo,
) -> Option<&'e DirEntry> {
    let lang_of = |e: &&&DirEntry| {
        let name = e.file_name().to_string_lossy().into_owned();
        split_name(&name, site).1.map(str::to_owned)
    };
    candidates
        .iter()
        .find(|e| lang_of(e).as_deref() == Some(lang))
        .or_else(|| candidates.iter().find(|e| lang_of(e).is_none()))
        .or_else(|| candidates.first())
        .copied()
}

/// `name` is `<stem>.<ext>` or `<stem>.<lang>.<ext>`.
fn is_named(name: &str, stem: &str) -> bool {
    name.strip_prefix(stem)
        .is_some_and(|rest| rest.starts_with('.') && rest.len() > 1)
}

fn join(key: &str, name: &str) -> String {
    if key.is_empty() {
        name.to_owned()
    } else {
        format!("{key}/{name}")
    }
}

/// Direct children of `dir`, sorted by name.
fn list(dir: &Path) -> Result<Vec<DirEntry>, walkdir::Error> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_named() {
        assert!(is_named("index.md", INDEX));
        assert!(is_named("index.zh.md", INDEX));
        assert!(is_named("_index.md", SECTION_INDEX));
        assert!(!is_named("_index.md", INDEX));
        assert!(!is_named("indexes.md", INDEX));
        assert!(!is_named("index.", INDEX));
        assert!(!is_named("index", INDEX));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("", "a.md"), "a.md");
        assert_eq!(join("posts/linux", "a.md"), "posts/linux/a.md");
    }

    #[test]
    fn test_list_sorted() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["b.md", "a.md", "c"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let names: Vec<_> = list(dir.path())
            .unwrap()
            .iter()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md", "c"]);
        assert!(list(&dir.path().join("missing")).is_err());
    }
}
