//! Text embedders.

use std::sync::Arc;

use async_trait::async_trait;
use medley_llm::LlmBackend;
use sha2::{Digest, Sha256};

use crate::error::RagError;
use crate::index::normalize_l2;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, all of the same length.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    fn name(&self) -> &str;
}

// ── Local feature hashing ─────────────────────────────────────────────────────

/// Deterministic bag-of-words embedder. Lowercased word unigrams and
/// bigrams are hashed into `dim` signed buckets and the result normalised.
/// Texts sharing vocabulary land close together; no model download needed.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        for word in &words {
            self.add_feature(&mut vector, word, 1.0);
        }
        for pair in words.windows(2) {
            self.add_feature(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }
        normalize_l2(&mut vector);
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&digest[..8]);
        let slot = (u64::from_le_bytes(bucket) % self.dim as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[slot] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

// ── Remote endpoint ───────────────────────────────────────────────────────────

/// Embeds through an LLM backend's embeddings endpoint.
pub struct LlmEmbedder {
    backend: Arc<dyn LlmBackend>,
}

impl LlmEmbedder {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Embedder for LlmEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self
            .backend
            .embed(texts.to_vec())
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    fn name(&self) -> &str {
        self.backend.model_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::dot;
    use medley_llm::{LlmError, LlmRequest, LlmResponse};
    use pretty_assertions::assert_eq;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_hashing_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::new(384);
        let a = embedder.embed(&texts(&["Rust ownership rules"])).await.unwrap();
        let b = embedder.embed(&texts(&["rust OWNERSHIP rules"])).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 384);
        assert!((dot(&a[0], &a[0]) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::new(384);
        let v = embedder
            .embed(&texts(&[
                "the borrow checker enforces ownership",
                "ownership and the borrow checker",
                "bananas are rich in potassium",
            ]))
            .await
            .unwrap();
        assert!(dot(&v[0], &v[1]) > dot(&v[0], &v[2]));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        let v = embedder.embed(&texts(&["  ...  "])).await.unwrap();
        assert!(v[0].iter().all(|x| *x == 0.0));
    }

    struct ShortBackend;

    #[async_trait]
    impl LlmBackend for ShortBackend {
        async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
            Err(LlmError::Malformed("unused".into()))
        }
        async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(vec![vec![1.0, 0.0]])
        }
        fn model_id(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn test_remote_count_mismatch_is_an_error() {
        let embedder = LlmEmbedder::new(Arc::new(ShortBackend));
        let err = embedder.embed(&texts(&["a", "b"])).await.unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert_eq!(embedder.name(), "short");
    }
}
