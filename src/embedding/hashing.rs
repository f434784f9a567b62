//! Offline feature-hashing embeddings.
//!
//! Each lowercase alphanumeric token, plus a 4-character stem of every
//! token at least that long, is hashed with SHA-256 into a bucket and a
//! sign. The vector is L2-normalized. Texts that
//! share vocabulary land close together; nothing else is captured.

use sha2::{Digest, Sha256};

use crate::embedding::{EmbeddingMode, EmbeddingProvider};
use crate::error::{GateError, Result};

/// Model name recorded for hashing-provider collections.
pub const HASHING_MODEL: &str = "feature-hashing-v1";

/// Length of the stem added for longer tokens.
const STEM_LEN: usize = 4;

/// Deterministic, dependency-free embeddings.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

/// Split text into lowercase alphanumeric tokens.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &'static str {
        "hashing"
    }

    fn model(&self) -> &str {
        HASHING_MODEL
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str, _mode: EmbeddingMode) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let mut features = 0usize;

        for token in tokenize(text) {
            self.add_feature(&mut vector, &format!("t:{}", token));
            features += 1;
            if token.chars().count() >= STEM_LEN {
                let stem: String = token.chars().take(STEM_LEN).collect();
                self.add_feature(&mut vector, &format!("s:{}", stem));
                features += 1;
            }
        }

        if features == 0 {
            return Err(GateError::invalid_input(
                "text has no alphanumeric tokens to embed",
            ));
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}
