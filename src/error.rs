//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ManifestError: Issues with package.json reading, parsing and writing
//! - RegistryError: Issues with package-manager backends
//! - ResolveError: Issues selecting versions (bad specifiers, peer conflicts)
//! - ConfigError: Issues with CLI flags and the rc file

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Package registry related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Version resolution errors
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("failed to parse JSON in {path}: {message}")]
    JsonParseError { path: PathBuf, message: String },

    /// A dependency could not be rewritten in place
    #[error("cannot update '{package}' in {path}: {message}")]
    UpdateFailed {
        path: PathBuf,
        package: String,
        message: String,
    },
}

/// Errors reported by a package-manager backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Package absent from the registry
    #[error("package '{package}' not found in {backend} registry")]
    NotFound { package: String, backend: String },

    /// Transient network or process failure (including timeouts)
    #[error("{backend} is unavailable for '{package}': {message}")]
    BackendUnavailable {
        package: String,
        backend: String,
        message: String,
    },

    /// The environment is not ready for this backend; the message is shown verbatim
    #[error("{message}")]
    BackendPrecondition { backend: String, message: String },
}

/// Error produced when a range specifier cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid specifier '{specifier}': {message}")]
pub struct SpecifierError {
    pub specifier: String,
    pub message: String,
}

/// Errors raised while choosing target versions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The declared specifier of a package is malformed or unsupported
    #[error("{package}: {source}")]
    InvalidSpecifier {
        package: String,
        #[source]
        source: SpecifierError,
    },

    /// No version of `package` satisfies every peer range declared against it
    #[error("no version of '{package}' satisfies its peer constraints: {}", .constraints.join(", "))]
    PeerConflict {
        package: String,
        constraints: Vec<String>,
    },

    /// The peer fixpoint did not settle within the iteration budget
    #[error(
        "peer resolution did not converge after {iterations} iterations; unstable packages: {}",
        .unstable.join(", ")
    )]
    PeerCycle {
        iterations: usize,
        unstable: Vec<String>,
    },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid duration format
    #[error("invalid duration format '{value}': expected format like '2w', '10d', '1m'")]
    InvalidDuration { value: String },

    /// Invalid upgrade target
    #[error("invalid target '{value}': expected 'patch', 'minor', 'major', 'latest' or '@<tag>'")]
    InvalidTarget { value: String },

    /// Invalid output format name
    #[error("invalid format '{value}': expected one of table, group, repo, time, lines")]
    InvalidFormat { value: String },

    /// Unknown package manager name
    #[error("invalid package manager '{value}': expected npm or yarn")]
    InvalidPackageManager { value: String },

    /// Invalid dependency section name
    #[error("invalid dependency section '{value}': expected prod, dev, optional or peer")]
    InvalidSection { value: String },

    /// The rc file could not be read or parsed
    #[error("invalid config file {path}: {message}")]
    InvalidConfigFile { path: PathBuf, message: String },

    /// Conflicting options; the message is shown verbatim
    #[error("{message}")]
    ConflictingOptions { message: String },
}

impl ManifestError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { path: path.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new JsonParseError
    pub fn json_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::JsonParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new UpdateFailed error
    pub fn update_failed(
        path: impl Into<PathBuf>,
        package: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ManifestError::UpdateFailed {
            path: path.into(),
            package: package.into(),
            message: message.into(),
        }
    }
}

impl RegistryError {
    /// Creates a new NotFound error
    pub fn not_found(package: impl Into<String>, backend: impl Into<String>) -> Self {
        RegistryError::NotFound {
            package: package.into(),
            backend: backend.into(),
        }
    }

    /// Creates a new BackendUnavailable error
    pub fn unavailable(
        package: impl Into<String>,
        backend: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::BackendUnavailable {
            package: package.into(),
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Creates a new BackendPrecondition error
    pub fn precondition(backend: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::BackendPrecondition {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Whether a caller may reasonably retry the failed query
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::BackendUnavailable { .. })
    }
}

impl SpecifierError {
    pub fn new(specifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a ConflictingOptions error
    pub fn conflict(message: impl Into<String>) -> Self {
        ConfigError::ConflictingOptions {
            message: message.into(),
        }
    }
}
