use super::{EmbeddingClient, EmbeddingClientError};
use async_trait::async_trait;

/// Deterministic embedding client that folds byte values into a fixed-size unit vector.
///
/// It carries no semantics beyond shared byte content, but it is stable across runs and needs
/// no network, which makes it the default for offline use and tests.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Construct an encoder producing vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % self.dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::Misconfigured(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn produces_unit_vectors_of_configured_dimension() {
        let client = HashingEmbedder::new(16);
        let vectors = client
            .generate_embeddings(vec!["grace period".into(), "waiting period".into()])
            .await
            .expect("embeddings");

        assert_eq!(vectors.len(), 2);
        for vector in &vectors {
            assert_eq!(vector.len(), 16);
            let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn identical_text_maps_to_identical_vector() {
        let client = HashingEmbedder::new(8);
        let vectors = client
            .generate_embeddings(vec!["same".into(), "same".into()])
            .await
            .expect("embeddings");
        assert_eq!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn zero_dimension_is_rejected() {
        let error = HashingEmbedder::new(0)
            .generate_embeddings(vec!["text".into()])
            .await
            .unwrap_err();
        assert!(matches!(error, EmbeddingClientError::Misconfigured(_)));
    }
}
