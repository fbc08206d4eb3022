//! Reference normalisation and resource resolution
//!
//! Every reference the manifest declares is normalised and then classified
//! into exactly one of four provenance buckets: inside the plugin's resource
//! root, elsewhere on disk, inside a dependency archive, or not found.
//! Dependency-archive hits are materialised into the run's temporary
//! directory through a concurrent cache so repeated lookups share one file.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::provider::{ArchiveProvider, NESTED_ARCHIVE_DIRS};

/// Normalise a manifest reference: trim, drop any `classpath:` prefixes,
/// forward slashes only, no leading slash. Idempotent.
pub fn normalize_reference(reference: &str) -> String {
    let mut s = reference.trim();
    while let Some(stripped) = s.strip_prefix("classpath:") {
        s = stripped.trim();
    }
    s.replace('\\', "/").trim_start_matches('/').to_string()
}

/// How the resource root was chosen, reported in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    /// Directory derived from the manifest class's code source
    CodeSource,
    TargetClasses,
    SrcMainResources,
    ProjectRoot,
    /// The archive index itself is the root
    Archive,
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionStrategy::CodeSource => write!(f, "code source"),
            ResolutionStrategy::TargetClasses => write!(f, "target/classes"),
            ResolutionStrategy::SrcMainResources => write!(f, "src/main/resources"),
            ResolutionStrategy::ProjectRoot => write!(f, "project root"),
            ResolutionStrategy::Archive => write!(f, "archive"),
        }
    }
}

/// Provenance of a resolved reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionSource {
    InRoot,
    OutsideRoot { actual: PathBuf },
    FromDependency { archive: String },
    NotFound,
}

/// Where the resolved bytes can be read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    File(PathBuf),
    /// Entry of the primary provider (archive mode)
    Entry(String),
    Missing,
}

/// Outcome of resolving one manifest reference
#[derive(Debug, Clone)]
pub struct ResolvedResource {
    /// The normalised reference
    pub reference: String,
    pub source: ResolutionSource,
    /// The resource root the reference was expected under
    pub expected_root: String,
    pub strategy: ResolutionStrategy,
    pub location: ResourceLocation,
}

impl ResolvedResource {
    pub fn is_found(&self) -> bool {
        !matches!(self.source, ResolutionSource::NotFound)
    }
}

/// Concurrent cache of materialised dependency entries, keyed by
/// (project root, normalised reference); single initialisation per key
#[derive(Default)]
pub struct MaterializationCache {
    entries: DashMap<(PathBuf, String), PathBuf>,
}

impl MaterializationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_create(
        &self,
        project_root: &Path,
        reference: &str,
        create: impl FnOnce() -> Option<PathBuf>,
    ) -> Option<PathBuf> {
        use dashmap::mapref::entry::Entry;

        let key = (project_root.to_path_buf(), reference.to_string());
        // The vacant entry holds its shard lock while create runs, so each
        // key is initialised exactly once
        match self.entries.entry(key) {
            Entry::Occupied(entry) => Some(entry.get().clone()),
            Entry::Vacant(entry) => {
                let created = create()?;
                Some(entry.insert(created).clone())
            }
        }
    }
}

/// What the resolver resolves against
pub enum ResolverTarget<'a> {
    Directory {
        project_root: &'a Path,
        resource_root: PathBuf,
        strategy: ResolutionStrategy,
    },
    Archive {
        archive: &'a ArchiveProvider,
    },
}

pub struct ResourceResolver<'a> {
    target: ResolverTarget<'a>,
    cache: &'a MaterializationCache,
    temp_dir: &'a Path,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(
        target: ResolverTarget<'a>,
        cache: &'a MaterializationCache,
        temp_dir: &'a Path,
    ) -> Self {
        Self {
            target,
            cache,
            temp_dir,
        }
    }

    /// The root references are expected under, as a display string
    pub fn expected_root(&self) -> String {
        match &self.target {
            ResolverTarget::Directory { resource_root, .. } => {
                resource_root.display().to_string()
            }
            ResolverTarget::Archive { archive } => archive.path().display().to_string(),
        }
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        match &self.target {
            ResolverTarget::Directory { strategy, .. } => *strategy,
            ResolverTarget::Archive { .. } => ResolutionStrategy::Archive,
        }
    }

    /// Classify one reference; total over all inputs
    pub fn resolve(&self, reference: &str) -> ResolvedResource {
        let normalized = normalize_reference(reference);
        let (source, location) = match &self.target {
            ResolverTarget::Directory {
                project_root,
                resource_root,
                ..
            } => self.resolve_on_disk(project_root, resource_root, &normalized),
            ResolverTarget::Archive { archive } => Self::resolve_in_archive(archive, &normalized),
        };
        debug!(reference = %normalized, ?source, "reference resolved");
        ResolvedResource {
            reference: normalized,
            source,
            expected_root: self.expected_root(),
            strategy: self.strategy(),
            location,
        }
    }

    fn resolve_on_disk(
        &self,
        project_root: &Path,
        resource_root: &Path,
        reference: &str,
    ) -> (ResolutionSource, ResourceLocation) {
        let in_root = resource_root.join(reference);
        if in_root.is_file() && is_under(resource_root, &in_root) {
            return (ResolutionSource::InRoot, ResourceLocation::File(in_root));
        }

        if let Some(actual) = find_on_wider_disk(project_root, reference) {
            return (
                ResolutionSource::OutsideRoot {
                    actual: actual.clone(),
                },
                ResourceLocation::File(actual),
            );
        }

        if let Some((archive, path)) = self.resolve_from_dependencies(project_root, reference) {
            return (
                ResolutionSource::FromDependency { archive },
                ResourceLocation::File(path),
            );
        }

        (ResolutionSource::NotFound, ResourceLocation::Missing)
    }

    /// Search the conventional dependency directories in their fixed order;
    /// the first archive containing the entry wins
    fn resolve_from_dependencies(
        &self,
        project_root: &Path,
        reference: &str,
    ) -> Option<(String, PathBuf)> {
        for dir in NESTED_ARCHIVE_DIRS {
            let dependency_dir = project_root.join(dir.trim_end_matches('/'));
            let mut jars: Vec<PathBuf> = match fs::read_dir(&dependency_dir) {
                Ok(entries) => entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| {
                        p.extension()
                            .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
                    })
                    .collect(),
                Err(_) => continue,
            };
            jars.sort();
            for jar in jars {
                if let Some(path) = self.materialize(project_root, &jar, reference) {
                    let archive = jar
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| jar.display().to_string());
                    return Some((archive, path));
                }
            }
        }
        None
    }

    /// Copy a dependency-archive entry into the run's temp dir, once per key
    fn materialize(&self, project_root: &Path, jar: &Path, reference: &str) -> Option<PathBuf> {
        self.cache.get_or_create(project_root, reference, || {
            let file = fs::File::open(jar).ok()?;
            let mut archive = ZipArchive::new(file).ok()?;
            let mut entry = archive.by_name(reference).ok()?;
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes).ok()?;

            let file_name = reference.replace('/', "_");
            let path = self.temp_dir.join(file_name);
            if let Err(err) = fs::write(&path, &bytes) {
                warn!(reference, %err, "failed to materialise dependency entry");
                return None;
            }
            Some(path)
        })
    }

    fn resolve_in_archive(
        archive: &ArchiveProvider,
        reference: &str,
    ) -> (ResolutionSource, ResourceLocation) {
        use crate::provider::ResourceProvider;
        // Both flat and source-tree prefixes are supported
        for prefix in ARCHIVE_RESOURCE_PREFIXES {
            let candidate = format!("{prefix}{reference}");
            if archive.exists(&candidate) {
                let source = match archive.nested_origin(&candidate) {
                    Some(nested) => ResolutionSource::FromDependency { archive: nested },
                    None => ResolutionSource::InRoot,
                };
                return (source, ResourceLocation::Entry(candidate));
            }
        }
        (ResolutionSource::NotFound, ResourceLocation::Missing)
    }
}

/// Entry prefixes an archive may keep its resources under, in search order
pub const ARCHIVE_RESOURCE_PREFIXES: [&str; 3] = ["", "src/main/resources/", "target/classes/"];

/// Canonical-prefix containment: a path lies under a root iff its canonical
/// absolute form starts with the root's
fn is_under(root: &Path, candidate: &Path) -> bool {
    match (fs::canonicalize(root), fs::canonicalize(candidate)) {
        (Ok(root), Ok(candidate)) => candidate.starts_with(&root),
        _ => false,
    }
}

/// Pick the resource root for an exploded project: the manifest class's
/// code source when that directory exists, the conventional layouts next,
/// the project root as last resort
pub fn select_resource_root(
    project_root: &Path,
    code_source: Option<&Path>,
) -> (PathBuf, ResolutionStrategy) {
    if let Some(code_source) = code_source
        && code_source.is_dir()
    {
        return (code_source.to_path_buf(), ResolutionStrategy::CodeSource);
    }
    let target_classes = project_root.join("target/classes");
    if target_classes.is_dir() {
        return (target_classes, ResolutionStrategy::TargetClasses);
    }
    let src_main = project_root.join("src/main/resources");
    if src_main.is_dir() {
        return (src_main, ResolutionStrategy::SrcMainResources);
    }
    (project_root.to_path_buf(), ResolutionStrategy::ProjectRoot)
}

/// First file in the tree whose relative forward-slash path ends with the
/// reference
fn find_on_wider_disk(project_root: &Path, reference: &str) -> Option<PathBuf> {
    let direct = project_root.join(reference);
    if direct.is_file() {
        return Some(direct);
    }
    let suffix = format!("/{reference}");
    walkdir::WalkDir::new(project_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .find(|e| {
            let rel = e.path().to_string_lossy().replace('\\', "/");
            rel.ends_with(&suffix)
        })
        .map(|e| e.path().to_path_buf())
}
