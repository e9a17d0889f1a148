//! Cross-encoder reranking provider implementations.
//!
//! A cross-encoder scores a (query, passage) pair jointly instead of
//! comparing two independently computed vectors, which makes it more accurate
//! than embedding similarity but too expensive to run over a whole corpus.
//! The retrieval pipeline therefore applies it only to the small candidate
//! pool produced by the similarity search stage.

use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use std::sync::{Arc, Mutex};

/// Relevance score a reranker assigned to one candidate passage.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankScore {
    /// Index of the passage in the input slice
    pub index: usize,
    /// Joint query/passage relevance score; higher is more relevant
    pub score: f32,
}

/// Trait for cross-encoder rerankers that jointly score query/passage pairs.
#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Score every passage against the query. The returned scores are in
    /// input order, one per passage; ordering by score is the caller's job.
    async fn rerank(&self, query: &str, passages: &[String]) -> Result<Vec<RerankScore>>;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// FastEmbed-based cross-encoder using the BGE reranker ONNX model
#[derive(Clone)]
pub struct FastEmbedReranker {
    model: Arc<Mutex<TextRerank>>,
}

impl std::fmt::Debug for FastEmbedReranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedReranker").finish()
    }
}

impl FastEmbedReranker {
    /// Load the reranker model on the blocking pool.
    pub async fn create() -> Result<Self> {
        tracing::info!("Initializing FastEmbed reranker");

        let model = tokio::task::spawn_blocking(|| -> Result<TextRerank> {
            let init_options = RerankInitOptions::new(RerankerModel::BGERerankerBase)
                .with_show_download_progress(true);

            TextRerank::try_new(init_options).map_err(|e| EmbedError::External { source: e })
        })
        .await??;

        tracing::info!("Reranker model loaded");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl RerankProvider for FastEmbedReranker {
    async fn rerank(&self, query: &str, passages: &[String]) -> Result<Vec<RerankScore>> {
        if passages.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Reranking {} passages", passages.len());

        let query = query.to_string();
        let passages = passages.to_vec();
        let model_clone = Arc::clone(&self.model);

        let results = tokio::task::spawn_blocking(move || -> Result<Vec<RerankScore>> {
            let mut model_guard = model_clone.lock().unwrap();
            let documents: Vec<&str> = passages.iter().map(|p| p.as_str()).collect();
            let reranked = model_guard
                .rerank(query.as_str(), documents, false, None)
                .map_err(|e| EmbedError::External { source: e })?;

            Ok(reranked
                .into_iter()
                .map(|r| RerankScore {
                    index: r.index,
                    score: r.score,
                })
                .collect())
        })
        .await??;

        // fastembed returns results ordered by score; restore input order so
        // the trait contract holds regardless of backend.
        let mut by_input: Vec<RerankScore> = results;
        by_input.sort_by_key(|r| r.index);
        Ok(by_input)
    }

    fn provider_name(&self) -> &str {
        "fastembed-bge-reranker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Integration test: downloads the real BGE reranker - run with: cargo test test_bge_rerank -- --ignored
    async fn test_bge_rerank() -> Result<()> {
        let reranker = FastEmbedReranker::create().await?;

        let passages = vec![
            "Jollof Rice is a one-pot rice dish from Nigeria.".to_string(),
            "A bicycle has two wheels and a frame.".to_string(),
        ];
        let scores = reranker
            .rerank("How do I make Jollof Rice?", &passages)
            .await?;

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].index, 0);
        assert_eq!(scores[1].index, 1);
        assert!(
            scores[0].score > scores[1].score,
            "on-topic passage should outscore the off-topic one"
        );
        Ok(())
    }
}
