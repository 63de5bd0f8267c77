use std::path::PathBuf;
use thiserror::Error;

use crate::models::ProviderKind;

/// Failure of a single generation provider call.
///
/// The split matters to the router only for logging: both kinds are
/// eligible for the one cross-provider failover, neither is retried on the
/// provider that produced it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Network trouble, timeouts, rate limits, upstream 5xx.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Content-policy refusal, client errors or a response we cannot use.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            ProviderError::Transient(err.to_string())
        } else if err.is_decode() {
            ProviderError::Rejected(format!("malformed response: {}", err))
        } else {
            ProviderError::Transient(err.to_string())
        }
    }
}

/// Both providers failed within one router call.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{primary} failed ({primary_error}); fallback {fallback} failed ({fallback_error})")]
pub struct RouterError {
    pub primary: ProviderKind,
    pub primary_error: ProviderError,
    pub fallback: ProviderKind,
    pub fallback_error: ProviderError,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt collection at {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize collection: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("news request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("news service returned status {0}")]
    Status(u16),

    #[error("could not parse news feed: {0}")]
    Feed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Missing(String),
}
