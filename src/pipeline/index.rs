//! Request-scoped, in-memory vector index.
//!
//! The index is built once from every chunk of a document and is read-only afterwards. Queries
//! are a linear scan with cosine similarity, which is plenty for one document's worth of chunks.

use super::types::{Chunk, IndexError, RetrievalResult, ScoredChunk};
use crate::embedding::EmbeddingClient;

struct IndexEntry {
    vector: Vec<f32>,
    magnitude: f32,
    chunk: Chunk,
}

/// Immutable collection of chunk embeddings supporting top-k similarity queries.
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
}

impl VectorIndex {
    /// Embed every chunk and store the resulting `(vector, chunk)` pairs.
    ///
    /// Every vector must have `dimension` finite components; anything else fails the whole build.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingClient,
        dimension: usize,
    ) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Ok(Self {
                entries: Vec::new(),
                dimension,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = embedder.generate_embeddings(texts).await?;
        if vectors.len() != chunks.len() {
            return Err(IndexError::MalformedEmbedding(format!(
                "expected {} vectors, received {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            check_vector(&vector, dimension)?;
            entries.push(IndexEntry {
                magnitude: magnitude(&vector),
                vector,
                chunk,
            });
        }

        tracing::debug!(entries = entries.len(), dimension, "Vector index built");
        Ok(Self { entries, dimension })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimension shared by all indexed vectors.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return the `k` chunks most similar to `vector`.
    ///
    /// Ties on score go to the lower per-unit sequence number, then to the earlier unit, so the
    /// ordering is fully reproducible.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult, IndexError> {
        if self.entries.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        check_vector(vector, self.dimension)?;

        let query_magnitude = magnitude(vector);
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| {
                let score =
                    cosine_similarity(&entry.vector, vector, entry.magnitude, query_magnitude);
                (score, entry)
            })
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| a.chunk.sequence.cmp(&b.chunk.sequence))
                .then_with(|| a.chunk.unit_index.cmp(&b.chunk.unit_index))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| ScoredChunk {
                score,
                chunk: entry.chunk.clone(),
            })
            .collect())
    }
}

fn check_vector(vector: &[f32], dimension: usize) -> Result<(), IndexError> {
    if vector.len() != dimension {
        return Err(IndexError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|value| !value.is_finite()) {
        return Err(IndexError::MalformedEmbedding(
            "vector contains non-finite components".into(),
        ));
    }
    Ok(())
}

fn magnitude(vector: &[f32]) -> f32 {
    vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

fn cosine_similarity(a: &[f32], b: &[f32], magnitude_a: f32, magnitude_b: f32) -> f32 {
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (magnitude_a * magnitude_b)
}
