//! Question-time lookup against a built index.

use super::index::VectorIndex;
use super::types::{IndexError, RetrievalResult};
use crate::embedding::EmbeddingClient;

/// Embeds questions and looks them up in a built [`VectorIndex`].
///
/// The retriever only borrows the index and the embedder, so any number of questions can be
/// retrieved concurrently against the same index.
pub struct Retriever<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn EmbeddingClient,
}

impl<'a> Retriever<'a> {
    /// Pair an index with the embedder that built it.
    pub fn new(index: &'a VectorIndex, embedder: &'a dyn EmbeddingClient) -> Self {
        Self { index, embedder }
    }

    /// Return the `k` chunks most similar to `question`, most similar first.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult, IndexError> {
        let mut vectors = self
            .embedder
            .generate_embeddings(vec![question.to_string()])
            .await?;
        let vector = vectors.pop().ok_or_else(|| {
            IndexError::MalformedEmbedding("embedding provider returned no vector".into())
        })?;
        self.index.query(&vector, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::index::tests::{TableEmbedder, chunk};

    #[tokio::test]
    async fn embeds_question_and_queries_index() {
        let embedder = TableEmbedder::new(&[
            ("premium grace period", vec![1.0, 0.0]),
            ("maternity cover", vec![0.0, 1.0]),
            ("How long is the grace period?", vec![0.9, 0.1]),
        ]);
        let index = VectorIndex::build(
            vec![
                chunk("premium grace period", 0, 0),
                chunk("maternity cover", 0, 1),
            ],
            &embedder,
            2,
        )
        .await
        .expect("index");

        let retriever = Retriever::new(&index, &embedder);
        let result = retriever
            .retrieve("How long is the grace period?", 1)
            .await
            .expect("retrieval");

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].chunk.text, "premium grace period");
    }

    #[tokio::test]
    async fn embedding_failure_is_reported() {
        let embedder = TableEmbedder::new(&[("chunk", vec![1.0, 0.0])]);
        let index = VectorIndex::build(vec![chunk("chunk", 0, 0)], &embedder, 2)
            .await
            .expect("index");

        let error = Retriever::new(&index, &embedder)
            .retrieve("unknown question", 4)
            .await
            .unwrap_err();
        assert!(matches!(error, IndexError::Embedding(_)));
    }
}
