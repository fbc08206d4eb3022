//! Run-scoped context threaded through every phase
//!
//! The context owns the only shared mutable state of a lint run: the
//! materialisation cache and the temporary directory backing it. The
//! temporary directory is deleted when the context is dropped, on any exit
//! path. API generation is set once after discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::TempDir;

use crate::discovery::ApiGeneration;
use crate::error::DsflintError;
use crate::resolver::MaterializationCache;
use crate::Result;

/// The DSF process-authorization codes accepted as known
///
/// A closed set supplied as data; the default is the DSF catalogue, callers
/// may override it.
#[derive(Debug, Clone)]
pub struct AuthorizationCodes {
    codes: HashSet<String>,
}

impl AuthorizationCodes {
    pub const DEFAULT_CODES: [&'static str; 9] = [
        "LOCAL_ORGANIZATION",
        "LOCAL_ORGANIZATION_PRACTITIONER",
        "REMOTE_ORGANIZATION",
        "LOCAL_ROLE",
        "LOCAL_ROLE_PRACTITIONER",
        "REMOTE_ROLE",
        "LOCAL_ALL",
        "LOCAL_ALL_PRACTITIONER",
        "REMOTE_ALL",
    ];

    pub fn custom(codes: impl IntoIterator<Item = String>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }
}

impl Default for AuthorizationCodes {
    fn default() -> Self {
        Self {
            codes: Self::DEFAULT_CODES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// What is being linted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintTarget {
    /// A packaged plugin archive (JAR)
    Archive(PathBuf),
    /// An exploded project directory
    Directory(PathBuf),
}

impl LintTarget {
    /// Classify a path; fails when it is neither a file nor a directory
    pub fn detect(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.is_file() {
            Ok(LintTarget::Archive(path))
        } else if path.is_dir() {
            Ok(LintTarget::Directory(path))
        } else {
            Err(DsflintError::plugin_not_readable(
                path,
                "path is neither a file nor a directory",
            ))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            LintTarget::Archive(p) | LintTarget::Directory(p) => p,
        }
    }

    /// Short plugin name derived from the path
    pub fn plugin_name(&self) -> String {
        self.path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path().display().to_string())
    }
}

/// Context owned by the orchestrator and passed to every phase
pub struct LintContext {
    api_generation: Option<ApiGeneration>,
    deadline: Option<Instant>,
    pub authorization_codes: AuthorizationCodes,
    pub cache: MaterializationCache,
    temp_dir: TempDir,
}

impl LintContext {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("dsflint-")
            .map_err(|e| DsflintError::io_error(std::env::temp_dir(), e))?;
        Ok(Self {
            api_generation: None,
            deadline: None,
            authorization_codes: AuthorizationCodes::default(),
            cache: MaterializationCache::new(),
            temp_dir,
        })
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_authorization_codes(mut self, codes: AuthorizationCodes) -> Self {
        self.authorization_codes = codes;
        self
    }

    /// Set once by the orchestrator after discovery
    pub fn set_api_generation(&mut self, generation: ApiGeneration) {
        self.api_generation = Some(generation);
    }

    pub fn api_generation(&self) -> ApiGeneration {
        // Discovery runs first; phases after it always see a generation
        self.api_generation.unwrap_or(ApiGeneration::V1)
    }

    pub fn deadline_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Directory for materialised dependency entries; dropped with the run
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_authorization_catalogue_is_the_dsf_set() {
        let codes = AuthorizationCodes::default();
        assert!(codes.contains("LOCAL_ALL"));
        assert!(codes.contains("REMOTE_ROLE"));
        assert!(!codes.contains("EVERYONE"));
    }

    #[test]
    fn custom_catalogue_replaces_the_default() {
        let codes = AuthorizationCodes::custom(vec!["MY_CODE".to_string()]);
        assert!(codes.contains("MY_CODE"));
        assert!(!codes.contains("LOCAL_ALL"));
    }

    #[test]
    fn temp_dir_is_deleted_on_drop() {
        let ctx = LintContext::new().unwrap();
        let path = ctx.temp_path().to_path_buf();
        assert!(path.is_dir());
        drop(ctx);
        assert!(!path.exists());
    }

    #[test]
    fn target_detection() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plugin.jar");
        std::fs::write(&file, b"zip").unwrap();
        assert!(matches!(
            LintTarget::detect(&file).unwrap(),
            LintTarget::Archive(_)
        ));
        assert!(matches!(
            LintTarget::detect(dir.path()).unwrap(),
            LintTarget::Directory(_)
        ));
        assert!(LintTarget::detect(dir.path().join("absent")).is_err());
        assert_eq!(LintTarget::detect(&file).unwrap().plugin_name(), "plugin");
    }
}
