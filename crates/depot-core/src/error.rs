//! Error types shared by every depot crate.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for depot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur across the depot crates.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// No workspace directory was found above the given path.
    #[error("no workspace found above {}", path.display())]
    #[diagnostic(
        code(depot::workspace_not_found),
        help("run `depot init-workspace` in the directory that should own the workspace")
    )]
    WorkspaceNotFound {
        /// The path the ascent started from.
        path: PathBuf,
    },

    /// A workspace already exists where one was about to be created.
    #[error("a workspace already exists at {}", path.display())]
    #[diagnostic(
        code(depot::workspace_exists),
        help("remove the existing .workspace directory or initialize elsewhere")
    )]
    WorkspaceExists {
        /// Root of the existing workspace.
        path: PathBuf,
    },

    /// A source set had no pin for the requested package.
    #[error("artifact not found for {namespace}/{name}-{version}")]
    #[diagnostic(
        code(depot::artifact_not_found),
        help("check the package identity, or publish the package into the source set")
    )]
    ArtifactNotFound {
        /// Namespace of the requested package.
        namespace: String,
        /// Name of the requested package.
        name: String,
        /// Version of the requested package.
        version: String,
    },

    /// An artifact quadruple was already present in the global space or store.
    #[error("artifact {namespace}/{name}-{version} build {build_number} already exists")]
    #[diagnostic(
        code(depot::artifact_exists),
        help("artifacts are immutable once registered; publish again to mint a new build number")
    )]
    ArtifactExists {
        /// Namespace of the artifact.
        namespace: String,
        /// Name of the artifact.
        name: String,
        /// Version of the artifact.
        version: String,
        /// Build number of the artifact.
        build_number: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected: {chain}")]
    #[diagnostic(
        code(depot::dependency_cycle),
        help("break the cycle by removing one of the listed dependency edges")
    )]
    DependencyCycle {
        /// The packages on the cycle, in traversal order.
        chain: String,
    },

    /// Two checked-out packages claim the same identity.
    #[error(
        "duplicate workspace packages for {namespace}/{name}-{version}: {} and {}",
        first.display(),
        second.display()
    )]
    #[diagnostic(
        code(depot::duplicate_package),
        help("each package identity may be checked out at most once per workspace")
    )]
    DuplicatePackage {
        /// Namespace of the conflicting package.
        namespace: String,
        /// Name of the conflicting package.
        name: String,
        /// Version of the conflicting package.
        version: String,
        /// First directory claiming the identity.
        first: PathBuf,
        /// Second directory claiming the identity.
        second: PathBuf,
    },

    /// Input failed identifier or structural validation.
    #[error("validation failed: {0}")]
    #[diagnostic(code(depot::validation))]
    Validation(String),

    /// A persisted backend type tag is not known to this binary.
    #[error("unknown backend type '{kind}'")]
    #[diagnostic(
        code(depot::unknown_backend),
        help("the workspace metadata was written by an incompatible depot version")
    )]
    UnknownBackend {
        /// The unrecognized type tag.
        kind: String,
    },

    /// A tar or gzip stream could not be decoded.
    #[error("archive error: {0}")]
    #[diagnostic(
        code(depot::archive),
        help("the artifact stream is corrupt or was produced by an incompatible tool")
    )]
    Archive(String),

    /// I/O error.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(code(depot::io))]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Optional path where the error occurred.
        path: Option<PathBuf>,
        /// Description of the operation being performed.
        operation: String,
    },

    /// JSON parsing or encoding error.
    #[error("JSON error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(code(depot::json))]
    Json {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// Optional path to the file involved.
        path: Option<PathBuf>,
    },

    /// YAML parsing error.
    #[error("YAML error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(code(depot::yaml))]
    Yaml {
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },
}

impl Error {
    /// Wrap an I/O error with the path and operation it occurred in.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
            operation: operation.into(),
        }
    }

    /// Construct a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Construct an archive decode error.
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive(message.into())
    }

    /// True if this is the distinguished not-found error source sets use,
    /// which lookup chains treat as "fall through to the next source set".
    pub fn is_artifact_not_found(&self) -> bool {
        matches!(self, Self::ArtifactNotFound { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "file operation".to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source, path: None }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Yaml { source, path: None }
    }
}
