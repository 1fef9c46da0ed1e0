//! Typed failure conditions surfaced by the deployment engine.
//!
//! Every operation returns [`DeployError`]; front ends are responsible for
//! presenting it. [`ErrorKind`] gives a copyable discriminant for matching.

use std::path::PathBuf;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Platform '{platform}' does not support {capability}")]
    UnsupportedCapability {
        platform: String,
        capability: &'static str,
    },

    #[error("Platform '{0}' is not installed (no detection path exists)")]
    PlatformNotInstalled(String),

    #[error("Project scope requires a detected project root")]
    ProjectRootRequired,

    #[error("Platform '{platform}' has no project-scope location for {capability}")]
    ProjectScopeUnsupported {
        platform: String,
        capability: &'static str,
    },

    #[error("Artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("Identity mismatch: expected '{expected}', document declares '{found}'")]
    IdentityMismatch { expected: String, found: String },

    #[error("Missing required field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    #[error("Malformed descriptor {}: {reason}", .path.display())]
    MalformedDescriptor { path: PathBuf, reason: String },

    #[error("Invalid path template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid TOML in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Expected {expected} at '{key}' in {}", .path.display())]
    UnexpectedShape {
        path: PathBuf,
        key: String,
        expected: &'static str,
    },
}

/// Copyable discriminant of [`DeployError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedPlatform,
    UnsupportedCapability,
    PlatformNotInstalled,
    ProjectRootRequired,
    ProjectScopeUnsupported,
    ArtifactNotFound,
    IdentityMismatch,
    MissingRequiredField,
    MalformedDescriptor,
    Io,
    Parse,
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
            DeployError::UnsupportedCapability { .. } => ErrorKind::UnsupportedCapability,
            DeployError::PlatformNotInstalled(_) => ErrorKind::PlatformNotInstalled,
            DeployError::ProjectRootRequired => ErrorKind::ProjectRootRequired,
            DeployError::ProjectScopeUnsupported { .. } => ErrorKind::ProjectScopeUnsupported,
            DeployError::ArtifactNotFound(_) => ErrorKind::ArtifactNotFound,
            DeployError::IdentityMismatch { .. } => ErrorKind::IdentityMismatch,
            DeployError::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            DeployError::MalformedDescriptor { .. } | DeployError::InvalidTemplate { .. } => {
                ErrorKind::MalformedDescriptor
            }
            DeployError::Io { .. } => ErrorKind::Io,
            DeployError::Yaml { .. }
            | DeployError::Json { .. }
            | DeployError::Toml { .. }
            | DeployError::UnexpectedShape { .. } => ErrorKind::Parse,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeployError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing_field(field: &str, context: impl Into<String>) -> Self {
        DeployError::MissingRequiredField {
            field: field.to_string(),
            context: context.into(),
        }
    }
}
