//! Two-stage query-time retrieval.
//!
//! Stage one embeds the query and pulls a candidate pool of `fetch_count`
//! chunks from the index by cosine similarity. Stage two runs a cross-encoder
//! over the (query, chunk) pairs and keeps the `rerank_top_n` best. The
//! stages deliberately disagree sometimes: the cross-encoder exists to
//! reorder what the cheaper vector search merely shortlisted.

use anyhow::{Result, bail};
use std::sync::Arc;

use crate::retrieval::recipe_index::{RecipeIndex, StoredChunk};
use sous_embed::{EmbeddingProvider, RerankProvider};

/// Tuning knobs for the two retrieval stages.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Candidate pool size for the similarity stage
    pub fetch_count: usize,
    /// Results kept after reranking; never more than `fetch_count`
    pub rerank_top_n: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            fetch_count: 6,
            rerank_top_n: 3,
        }
    }
}

impl RetrieverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fetch_count == 0 {
            bail!("fetch_count must be at least 1");
        }
        if self.rerank_top_n == 0 || self.rerank_top_n > self.fetch_count {
            bail!(
                "rerank_top_n must be between 1 and fetch_count ({})",
                self.fetch_count
            );
        }
        Ok(())
    }
}

/// A retrieved chunk with its cross-encoder relevance score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: StoredChunk,
    pub score: f32,
}

/// Keep the best-scoring chunk per parent document, preserving score order.
///
/// Several chunks of one recipe often survive reranking together; when the
/// caller wants distinct recipes (source attribution, "show me a dish"), the
/// first occurrence wins because the input is already sorted best-first.
pub fn dedup_by_document(scored: &[ScoredChunk]) -> Vec<ScoredChunk> {
    let mut seen = std::collections::HashSet::new();
    scored
        .iter()
        .filter(|s| seen.insert(s.chunk.document_id.clone()))
        .cloned()
        .collect()
}

/// Two-stage retriever over a built [`RecipeIndex`].
pub struct RecipeRetriever {
    index: RecipeIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Arc<dyn RerankProvider>,
    config: RetrieverConfig,
}

impl RecipeRetriever {
    pub fn new(
        index: RecipeIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn RerankProvider>,
        config: RetrieverConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            index,
            embedder,
            reranker,
            config,
        })
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Retrieve the most relevant chunks for `query`, best first.
    ///
    /// Returns at most `rerank_top_n` chunks; fewer when the index holds
    /// fewer, and none when it is empty.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed_text(query).await?;
        let candidates = self
            .index
            .search_similar(&query_embedding, self.config.fetch_count)
            .await?;

        if candidates.is_empty() {
            tracing::debug!("No candidates for query: {query}");
            return Ok(vec![]);
        }

        let passages: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let scores = self.reranker.rerank(query, &passages).await?;

        let mut scored: Vec<ScoredChunk> = scores
            .into_iter()
            .map(|s| ScoredChunk {
                chunk: candidates[s.index].clone(),
                score: s.score,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.config.rerank_top_n);

        tracing::debug!(
            "Retrieved {} chunks for query (pool of {})",
            scored.len(),
            candidates.len()
        );
        Ok(scored)
    }
}
