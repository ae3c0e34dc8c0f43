//! Error taxonomy shared by the store, importer, search and generation paths.
//!
//! Per-item problems inside an import never surface here: they degrade to a
//! missing field (logged) or a skipped object. Everything in [`Error`] is an
//! operation-level failure that the caller has to handle.

use std::{fmt, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A required resource that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Collection(String),
    File(PathBuf),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection(name) => write!(f, "collection '{name}'"),
            Self::File(path) => write!(f, "file '{}'", path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(Missing),

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{provider} credentials missing or rejected: {reason}")]
    Auth { provider: String, reason: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("{service} request failed: {reason}")]
    Upstream {
        service: &'static str,
        reason: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::NotFound(Missing::Collection(name.into()))
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(Missing::File(path.into()))
    }

    pub fn upstream(service: &'static str, reason: impl fmt::Display) -> Self {
        Self::Upstream {
            service,
            reason: reason.to_string(),
        }
    }

    pub fn auth(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Auth {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// True when a collection (not a file) was missing.
    pub fn is_missing_collection(&self) -> bool {
        matches!(self, Self::NotFound(Missing::Collection(_)))
    }

    /// Convert a missing-file error into an [`Error::Io`] so callers that treat
    /// any unreadable input the same way get a single variant.
    pub fn into_io(self) -> Self {
        match self {
            Self::NotFound(Missing::File(path)) => Self::Io {
                path,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
            other => other,
        }
    }

    /// Remediation hint shown to operators next to the error.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound(Missing::Collection(_)) => {
                Some("create the collection first with `mmrag schema`")
            },
            Self::NotFound(Missing::File(_)) | Self::Io { .. } => {
                Some("check that the path exists and is readable")
            },
            Self::Auth { .. } => Some(
                "set COHERE_APIKEY (or embedding.cohere_api_key in the config) and make sure the key is valid",
            ),
            Self::Upstream { service, .. } if *service == "generation" => Some(
                "is Ollama running? check generation.endpoint and that the model has been pulled",
            ),
            Self::Upstream { .. } => {
                Some("is the vector store running and reachable? check store.url")
            },
            Self::Serialization(_) | Self::InvalidInput(_) => None,
        }
    }
}
