//! Error types and handling for DSF plugin linting operations

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for linting operations
#[derive(Debug, Error)]
pub enum DsflintError {
    /// The plugin archive or project directory cannot be read
    #[error("Plugin not readable at '{path}': {reason}")]
    PluginNotReadable { path: PathBuf, reason: String },

    /// No service registration file and no plugin definition class was found
    #[error("No process plugin definition found: {searched}")]
    MissingServiceRegistration { searched: String },

    /// More than one plugin definition of the same API generation was found
    #[error("Multiple process plugin definitions of API {generation} found: {candidates}")]
    MultipleManifestsFound {
        generation: String,
        candidates: String,
    },

    /// A plugin definition class matches the naming convention but declares
    /// neither the v1 nor the v2 marker in its super-type chain
    #[error("Class '{class_name}' is not a v1 or v2 process plugin definition")]
    InvalidApiVersion { class_name: String },

    /// Malformed class file encountered while scanning for plugin definitions
    #[error("Class file error in '{entry}': {message}")]
    ClassFileError { entry: String, message: String },

    /// Archive index or entry access failed
    #[error("Archive error for '{path}': {message}")]
    ArchiveError { path: PathBuf, message: String },

    /// A referenced resource could not be opened
    #[error("Resource not found: '{reference}'")]
    ResourceNotFound { reference: String },

    /// XML or JSON document could not be parsed
    #[error("Parse error in '{file}': {message}")]
    ParseError { file: String, message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Plugin,
    Discovery,
    ClassFile,
    Archive,
    Resource,
    Parse,
    Io,
    Internal,
}

impl DsflintError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DsflintError::PluginNotReadable { .. } => ErrorKind::Plugin,
            DsflintError::MissingServiceRegistration { .. } => ErrorKind::Discovery,
            DsflintError::MultipleManifestsFound { .. } => ErrorKind::Discovery,
            DsflintError::InvalidApiVersion { .. } => ErrorKind::Discovery,
            DsflintError::ClassFileError { .. } => ErrorKind::ClassFile,
            DsflintError::ArchiveError { .. } => ErrorKind::Archive,
            DsflintError::ResourceNotFound { .. } => ErrorKind::Resource,
            DsflintError::ParseError { .. } => ErrorKind::Parse,
            DsflintError::IoError { .. } => ErrorKind::Io,
            DsflintError::InternalError { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error aborts the whole run or only the current file
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Resource | ErrorKind::ClassFile | ErrorKind::Parse
        )
    }

    /// Create a parse error
    pub fn parse_error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a plugin-not-readable error
    pub fn plugin_not_readable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::PluginNotReadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-service-registration error
    pub fn missing_service_registration(searched: impl Into<String>) -> Self {
        Self::MissingServiceRegistration {
            searched: searched.into(),
        }
    }

    /// Create a multiple-manifests error
    pub fn multiple_manifests(
        generation: impl Into<String>,
        candidates: impl Into<String>,
    ) -> Self {
        Self::MultipleManifestsFound {
            generation: generation.into(),
            candidates: candidates.into(),
        }
    }

    /// Create an invalid-api-version error
    pub fn invalid_api_version(class_name: impl Into<String>) -> Self {
        Self::InvalidApiVersion {
            class_name: class_name.into(),
        }
    }

    /// Create a class file error
    pub fn class_file_error(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClassFileError {
            entry: entry.into(),
            message: message.into(),
        }
    }

    /// Create an archive error
    pub fn archive_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ArchiveError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a resource-not-found error
    pub fn resource_not_found(reference: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            reference: reference.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for DsflintError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}
