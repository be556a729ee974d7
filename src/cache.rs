//! Persistent per-page cache of analysis results.
//!
//! Results are keyed by document (usually its path) and page number and
//! stored as JSON. Segment identifiers are only unique within a process, so
//! every value read back is refreshed before it is handed out.

use crate::error::Result;
use crate::lines::PageLines;
use crate::structure::TableStructure;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Values that own segments and can have their identifiers reissued.
pub trait Refresh {
    /// Give every owned segment a fresh identifier.
    fn refresh(&mut self);
}

impl Refresh for TableStructure {
    fn refresh(&mut self) {
        TableStructure::refresh(self);
    }
}

impl Refresh for PageLines {
    fn refresh(&mut self) {
        PageLines::refresh(self);
    }
}

/// Cache of inferred table structures.
pub type StructureCache = PageCache<TableStructure>;

/// Cache of consolidated page lines.
pub type LineCache = PageCache<PageLines>;

/// Document key → page number → value, optionally backed by a JSON file.
#[derive(Debug, Clone)]
pub struct PageCache<T> {
    path: Option<PathBuf>,
    entries: BTreeMap<String, BTreeMap<u32, T>>,
}

impl<T> Default for PageCache<T> {
    fn default() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }
}

impl<T> PageCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Refresh,
{
    /// An empty cache that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the cache file at `path`, starting empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            log::debug!("Reading page cache {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            log::debug!("No page cache at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// File backing the cache, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// A refreshed copy of the cached value for `key` and `page`.
    pub fn get(&self, key: &str, page: u32) -> Option<T> {
        let mut value = self.entries.get(key)?.get(&page)?.clone();
        log::debug!("Page cache hit for {} page {}", key, page);
        value.refresh();
        Some(value)
    }

    /// Whether a value is cached for `key` and `page`.
    pub fn contains(&self, key: &str, page: u32) -> bool {
        self.entries.get(key).is_some_and(|pages| pages.contains_key(&page))
    }

    /// Store a value, then write the cache file if there is one.
    pub fn insert(&mut self, key: impl Into<String>, page: u32, value: T) -> Result<()> {
        self.entries.entry(key.into()).or_default().insert(page, value);
        self.save()
    }

    /// Number of cached pages across all documents.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the cache file. Does nothing for an in-memory cache.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        log::debug!("Writing page cache {} ({} pages)", path.display(), self.len());
        let content = serde_json::to_string(&self.entries)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
