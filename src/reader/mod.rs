//! Content readers and the parsed-metadata cache.
//!
//! A [`Reader`] turns the raw bytes of one file into a [`Meta`] map. Readers
//! are registered per file extension in a [`ReaderRegistry`] the caller builds
//! and hands to the builder; a file whose extension has no reader is an asset.
//!
//! [`MetaCache`] memoizes parsed files by path for the whole build, so a file
//! visited once per language (an `_index` shared by every language pass, a
//! page probed for its `lang` key) is read and parsed once.

mod frontmatter;

pub use frontmatter::FrontMatterReader;

use crate::meta::Meta;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("content is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid front matter")]
    FrontMatter(#[from] toml::de::Error),

    #[error("no metadata")]
    Empty,

    #[error("no reader for `{0}`")]
    Unsupported(PathBuf),
}

/// Parses one file format into metadata.
///
/// Must return a non-empty map or an error.
pub trait Reader: Send + Sync {
    fn read(&self, bytes: &[u8]) -> Result<Meta, ReadError>;
}

// ============================================================================
// Registry
// ============================================================================

/// Readers keyed by lowercase file extension.
#[derive(Default, Clone)]
pub struct ReaderRegistry {
    readers: FxHashMap<String, Arc<dyn Reader>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the front-matter reader for `md`, `markdown`, `txt` and `html`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let front_matter: Arc<dyn Reader> = Arc::new(FrontMatterReader);
        for ext in ["md", "markdown", "txt", "html"] {
            registry.register_shared(ext, Arc::clone(&front_matter));
        }
        registry
    }

    pub fn register(&mut self, ext: &str, reader: impl Reader + 'static) {
        self.register_shared(ext, Arc::new(reader));
    }

    fn register_shared(&mut self, ext: &str, reader: Arc<dyn Reader>) {
        self.readers.insert(ext.to_ascii_lowercase(), reader);
    }

    pub fn get(&self, path: &Path) -> Option<&dyn Reader> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.readers.get(&ext).map(Arc::as_ref)
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// Read and parse a file with the reader registered for its extension.
    pub fn read_file(&self, path: &Path) -> Result<Meta, ReadError> {
        let reader = self
            .get(path)
            .ok_or_else(|| ReadError::Unsupported(path.to_path_buf()))?;
        let bytes = fs::read(path).map_err(|e| ReadError::Io(path.to_path_buf(), e))?;
        let meta = reader.read(&bytes)?;
        if meta.is_empty() {
            return Err(ReadError::Empty);
        }
        Ok(meta)
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Read-through cache of parsed files. Never invalidated during a build;
/// failures are not cached.
#[derive(Debug, Default)]
pub struct MetaCache {
    entries: RwLock<FxHashMap<PathBuf, Arc<Meta>>>,
}

impl MetaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata of `path`, parsing it on a miss.
    ///
    /// Parsing happens outside the lock; when two workers miss the same path
    /// concurrently the first stored result wins.
    pub fn get_or_read(&self, path: &Path, readers: &ReaderRegistry) -> Result<Arc<Meta>, ReadError> {
        if let Some(meta) = self.entries.read().get(path) {
            return Ok(Arc::clone(meta));
        }

        let meta = Arc::new(readers.read_file(path)?);
        let mut entries = self.entries.write();
        Ok(Arc::clone(entries.entry(path.to_path_buf()).or_insert(meta)))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
