//! Text embedding providers.
//!
//! The trace store only sees the [`EmbeddingProvider`] trait. Two
//! implementations exist: [`VoyageProvider`] calls the Voyage AI HTTP API,
//! [`HashingProvider`] computes deterministic bag-of-words vectors offline.

pub mod credentials;
pub mod hashing;
pub mod voyage;

use std::path::Path;

use crate::config::{EmbeddingConfig, ProviderKind};
use crate::error::Result;

pub use credentials::{resolve_api_key, ApiKeySource, API_KEY_ENV};
pub use hashing::{HashingProvider, HASHING_MODEL};
pub use voyage::VoyageProvider;

/// What a text is embedded for.
///
/// Providers may embed documents and queries differently; both modes map
/// into the same vector space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingMode {
    /// Text being stored.
    Document,
    /// Text being searched for.
    Query,
}

impl EmbeddingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Query => "query",
        }
    }
}

/// Produces fixed-length vectors for text.
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for display.
    fn name(&self) -> &'static str;

    /// Model identifier recorded with new collections.
    fn model(&self) -> &str;

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Embed one text.
    ///
    /// Any failure to obtain a vector is a `Transport` error. There is no retry.
    fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>>;
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        (**self).embed(text, mode)
    }
}

/// Build the configured provider.
///
/// For Voyage this resolves the API key, so a missing credential surfaces
/// here as a `Config` error before any request is made.
pub fn create_provider(
    config: &EmbeddingConfig,
    project_root: &Path,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider {
        ProviderKind::Voyage => {
            let (api_key, source) = resolve_api_key(project_root)?;
            tracing::debug!("using Voyage API key from {}", source);
            Ok(Box::new(VoyageProvider::new(config, api_key)?))
        }
        ProviderKind::Hashing => Ok(Box::new(HashingProvider::new(config.dimension))),
    }
}

/// Model name a new collection is created with, without building a provider.
pub fn collection_model(config: &EmbeddingConfig) -> &str {
    match config.provider {
        ProviderKind::Voyage => &config.model,
        ProviderKind::Hashing => HASHING_MODEL,
    }
}
