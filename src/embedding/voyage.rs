//! Voyage AI embeddings over HTTP.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::embedding::{EmbeddingMode, EmbeddingProvider};
use crate::error::{GateError, Result};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: [&'a str; 1],
    model: &'a str,
    input_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

/// Client for `POST {base_url}/embeddings`.
pub struct VoyageProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

impl std::fmt::Debug for VoyageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoyageProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl VoyageProvider {
    /// Create a client from configuration and a resolved API key.
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GateError::transport(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

impl EmbeddingProvider for VoyageProvider {
    fn name(&self) -> &'static str {
        "voyage"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            input: [text],
            model: &self.model,
            input_type: mode.as_str(),
        };

        tracing::debug!(model = %self.model, mode = mode.as_str(), "requesting embedding");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| GateError::transport(format!("Voyage request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GateError::transport(format!(
                "Voyage returned {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| GateError::transport(format!("invalid Voyage response: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| GateError::transport("Voyage response contained no embeddings"))
    }
}
