//! Name-keyed access to plugin resource bytes
//!
//! Three provider variants compose polymorphically: a directory tree, a zip
//! archive (with an optional nested dependency-jar scan), and an ordered
//! composite. Listings are forward-slash paths without a leading slash;
//! listing failures degrade to an empty sequence.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::DsflintError;
use crate::Result;

/// Fixed nested-archive locations inside a plugin archive, in search order.
/// The order is load-bearing: the first archive containing an entry wins.
pub const NESTED_ARCHIVE_DIRS: [&str; 2] = ["target/dependency/", "target/dependencies/"];

/// Predicate restricting which entries a provider exposes
pub type EntryFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Uniform read access to a tree of named byte streams
pub trait ResourceProvider: Send + Sync {
    /// Entries whose path starts with the given directory prefix,
    /// de-duplicated, with forward-slash separators
    fn list(&self, prefix: &str) -> Vec<String>;

    /// Read the bytes of one entry
    fn open(&self, path: &str) -> Result<Vec<u8>>;

    fn exists(&self, path: &str) -> bool;

    /// Human-readable description for diagnostics
    fn describe(&self) -> String;
}

/// Filesystem-backed provider rooted at a directory
pub struct DirProvider {
    root: PathBuf,
    filter: Option<EntryFilter>,
}

impl DirProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: EntryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative_name(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if name.is_empty() { None } else { Some(name) }
    }

    fn accepts(&self, name: &str) -> bool {
        self.filter.as_ref().is_none_or(|f| f(name))
    }
}

impl ResourceProvider for DirProvider {
    fn list(&self, prefix: &str) -> Vec<String> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!(root = %self.root.display(), %err, "directory listing degraded");
                    None
                }
            })
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = self.relative_name(entry.path())
                && name.starts_with(prefix)
                && self.accepts(&name)
            {
                entries.push(name);
            }
        }
        entries
    }

    fn open(&self, path: &str) -> Result<Vec<u8>> {
        let candidate = self.root.join(path);
        if !candidate.is_file() {
            return Err(DsflintError::resource_not_found(path));
        }
        fs::read(&candidate).map_err(|e| DsflintError::io_error(candidate, e))
    }

    fn exists(&self, path: &str) -> bool {
        self.root.join(path).is_file() && self.accepts(path)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// Where an archive entry comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum EntrySource {
    Primary,
    /// Entry of a nested archive, keyed by the nested archive's entry name
    Nested(String),
}

/// Archive-backed provider over a zip container (plugin JAR)
///
/// The entry index is built lazily on first use. With the nested scan
/// enabled, archives at the conventional dependency locations contribute
/// their entries as well; the primary archive always wins on name clashes.
pub struct ArchiveProvider {
    path: PathBuf,
    filter: Option<EntryFilter>,
    scan_nested: bool,
    index: OnceCell<IndexMap<String, EntrySource>>,
}

impl ArchiveProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            filter: None,
            scan_nested: false,
            index: OnceCell::new(),
        }
    }

    pub fn with_filter(mut self, filter: EntryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_nested_scan(mut self, scan_nested: bool) -> Self {
        self.scan_nested = scan_nested;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn accepts(&self, name: &str) -> bool {
        self.filter.as_ref().is_none_or(|f| f(name))
    }

    fn index(&self) -> &IndexMap<String, EntrySource> {
        self.index.get_or_init(|| match self.build_index() {
            Ok(index) => index,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "archive listing degraded");
                IndexMap::new()
            }
        })
    }

    fn build_index(&self) -> Result<IndexMap<String, EntrySource>> {
        let file = fs::File::open(&self.path)
            .map_err(|e| DsflintError::io_error(self.path.clone(), e))?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| DsflintError::archive_error(self.path.clone(), e.to_string()))?;

        let mut index = IndexMap::new();
        let mut nested_names: Vec<String> = Vec::new();
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| DsflintError::archive_error(self.path.clone(), e.to_string()))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().replace('\\', "/");
            if self.scan_nested
                && name.ends_with(".jar")
                && NESTED_ARCHIVE_DIRS.iter().any(|d| name.starts_with(d))
            {
                nested_names.push(name.clone());
            }
            index.insert(name, EntrySource::Primary);
        }

        if self.scan_nested {
            // Keep the conventional directory order, then archive order
            nested_names.sort_by_key(|name| {
                NESTED_ARCHIVE_DIRS
                    .iter()
                    .position(|d| name.starts_with(d))
                    .unwrap_or(usize::MAX)
            });
            for nested in nested_names {
                match self.read_primary_entry(&mut archive, &nested) {
                    Ok(bytes) => match ZipArchive::new(Cursor::new(bytes)) {
                        Ok(inner) => {
                            for name in inner.file_names() {
                                let name = name.replace('\\', "/");
                                if !name.ends_with('/') {
                                    index
                                        .entry(name)
                                        .or_insert_with(|| EntrySource::Nested(nested.clone()));
                                }
                            }
                        }
                        Err(err) => {
                            warn!(%nested, %err, "nested archive unreadable, skipping");
                        }
                    },
                    Err(err) => warn!(%nested, %err, "nested archive unreadable, skipping"),
                }
            }
        }

        debug!(path = %self.path.display(), entries = index.len(), "archive indexed");
        Ok(index)
    }

    fn read_primary_entry<R: Read + std::io::Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        name: &str,
    ) -> Result<Vec<u8>> {
        let mut entry = archive
            .by_name(name)
            .map_err(|e| DsflintError::archive_error(self.path.clone(), e.to_string()))?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| DsflintError::io_error(self.path.clone(), e))?;
        Ok(bytes)
    }

    fn open_from_source(&self, path: &str, source: &EntrySource) -> Result<Vec<u8>> {
        let file = fs::File::open(&self.path)
            .map_err(|e| DsflintError::io_error(self.path.clone(), e))?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| DsflintError::archive_error(self.path.clone(), e.to_string()))?;
        match source {
            EntrySource::Primary => self.read_primary_entry(&mut archive, path),
            EntrySource::Nested(nested) => {
                let bytes = self.read_primary_entry(&mut archive, nested)?;
                let mut inner = ZipArchive::new(Cursor::new(bytes))
                    .map_err(|e| DsflintError::archive_error(self.path.clone(), e.to_string()))?;
                let mut entry = inner
                    .by_name(path)
                    .map_err(|e| DsflintError::archive_error(self.path.clone(), e.to_string()))?;
                let mut out = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut out)
                    .map_err(|e| DsflintError::io_error(self.path.clone(), e))?;
                Ok(out)
            }
        }
    }

    /// Name of the nested archive an entry originates from, if any
    pub fn nested_origin(&self, path: &str) -> Option<String> {
        match self.index().get(path) {
            Some(EntrySource::Nested(nested)) => Some(nested.clone()),
            _ => None,
        }
    }
}

impl ResourceProvider for ArchiveProvider {
    fn list(&self, prefix: &str) -> Vec<String> {
        self.index()
            .keys()
            .filter(|name| name.starts_with(prefix) && self.accepts(name))
            .cloned()
            .collect()
    }

    fn open(&self, path: &str) -> Result<Vec<u8>> {
        let source = self
            .index()
            .get(path)
            .cloned()
            .ok_or_else(|| DsflintError::resource_not_found(path))?;
        self.open_from_source(path, &source)
    }

    fn exists(&self, path: &str) -> bool {
        self.index().contains_key(path) && self.accepts(path)
    }

    fn describe(&self) -> String {
        format!("archive {}", self.path.display())
    }
}

/// Ordered composite over sub-providers; the ordering is the tie-break
pub struct CompositeProvider {
    children: Vec<Box<dyn ResourceProvider>>,
}

impl CompositeProvider {
    pub fn new(children: Vec<Box<dyn ResourceProvider>>) -> Self {
        Self { children }
    }
}

impl ResourceProvider for CompositeProvider {
    fn list(&self, prefix: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut entries = Vec::new();
        for child in &self.children {
            for name in child.list(prefix) {
                if seen.insert(name.clone()) {
                    entries.push(name);
                }
            }
        }
        entries
    }

    fn open(&self, path: &str) -> Result<Vec<u8>> {
        for child in &self.children {
            if child.exists(path) {
                return child.open(path);
            }
        }
        Err(DsflintError::resource_not_found(path))
    }

    fn exists(&self, path: &str) -> bool {
        self.children.iter().any(|c| c.exists(path))
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.children.iter().map(|c| c.describe()).collect();
        format!("composite [{}]", parts.join(", "))
    }
}

/// Entry filter accepting FHIR-looking paths (xml/json, case-insensitive suffix)
pub fn fhir_entry_filter() -> EntryFilter {
    Arc::new(|name: &str| {
        let lower = name.to_ascii_lowercase();
        lower.ends_with(".xml") || lower.ends_with(".json")
    })
}

/// Entry filter accepting BPMN process models
pub fn bpmn_entry_filter() -> EntryFilter {
    Arc::new(|name: &str| name.to_ascii_lowercase().ends_with(".bpmn"))
}
