//! Failure taxonomy for a single resolver call.
//!
//! Every variant is local to one call: resolvers log it and answer with an
//! empty list or `None`. See [`crate::resolver::Resolver`].

use thiserror::Error;

use crate::crypto::CryptoError;

/// Resolver pipeline errors
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("missing {0}")]
    Extraction(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid id: {0}")]
    InvalidId(String),
}

impl ResolveError {
    /// Shorthand for an [`ResolveError::Extraction`] failure.
    pub fn missing(what: impl Into<String>) -> Self {
        Self::Extraction(what.into())
    }

    /// Transport-level failure (including non-2xx status).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
