//! End-to-end pipeline assembly.
//!
//! [`RecipePipeline::build`] runs the offline phase once: load the corpus,
//! chunk it, and bring the persisted index up to date (re-embedding only
//! when the corpus file or embedding model changed since the last build).
//! The resulting pipeline value answers any number of queries. All wiring
//! is explicit; there is no global state.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::answer::{Answer, ChatModel, compose_answer};
use crate::corpus::{Document, load_recipes};
use crate::retrieval::chunking::{ChunkingConfig, chunk_documents};
use crate::retrieval::recipe_index::{IndexStats, RecipeIndex};
use crate::retrieval::retriever::{RecipeRetriever, RetrieverConfig, ScoredChunk};
use sous_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider, FastEmbedReranker, RerankProvider};

/// Everything needed to assemble a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// JSON recipe corpus file
    pub corpus_path: PathBuf,
    /// Directory holding the persisted index database
    pub index_dir: PathBuf,
    pub chunking: ChunkingConfig,
    pub retriever: RetrieverConfig,
    pub embed: EmbedConfig,
}

impl PipelineConfig {
    pub fn new(corpus_path: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            index_dir: index_dir.into(),
            chunking: ChunkingConfig::default(),
            retriever: RetrieverConfig::default(),
            embed: EmbedConfig::default(),
        }
    }
}

/// A built retrieval pipeline, ready to answer queries.
pub struct RecipePipeline {
    documents: Vec<Document>,
    index: RecipeIndex,
    retriever: RecipeRetriever,
    rebuilt: bool,
}

impl RecipePipeline {
    /// Assemble the pipeline with explicit model providers.
    ///
    /// Loads and chunks the corpus, then ensures the index matches it. The
    /// corpus file is hashed byte-for-byte; any change, however small, makes
    /// the persisted build stale and triggers a full re-embed.
    pub async fn build(
        config: PipelineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn RerankProvider>,
    ) -> Result<Self> {
        let corpus_bytes = std::fs::read(&config.corpus_path).with_context(|| {
            format!("recipe corpus not found: {}", config.corpus_path.display())
        })?;
        let corpus_hash = *blake3::hash(&corpus_bytes).as_bytes();

        let documents = load_recipes(&config.corpus_path)?;
        let chunks = chunk_documents(&documents, &config.chunking)?;

        let index = RecipeIndex::open(&config.index_dir).await?;
        let rebuilt = index
            .ensure_built(
                &chunks,
                embedder.as_ref(),
                corpus_hash,
                &config.embed.model_id(),
            )
            .await?;

        let retriever =
            RecipeRetriever::new(index.clone(), embedder, reranker, config.retriever)?;

        Ok(Self {
            documents,
            index,
            retriever,
            rebuilt,
        })
    }

    /// Assemble the pipeline with the stock fastembed providers.
    pub async fn build_default(config: PipelineConfig) -> Result<Self> {
        let embedder = FastEmbedProvider::create(config.embed.clone()).await?;
        let reranker = FastEmbedReranker::create().await?;
        Self::build(config, Arc::new(embedder), Arc::new(reranker)).await
    }

    /// Whether building this pipeline re-embedded the corpus.
    pub fn rebuilt(&self) -> bool {
        self.rebuilt
    }

    /// The loaded corpus, in file order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        self.index.stats().await
    }

    /// Retrieve the most relevant chunks for a query, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        self.retriever.retrieve(query).await
    }

    /// Answer a question: retrieve, render context, ask the chat model.
    pub async fn ask(&self, question: &str, model: &dyn ChatModel) -> Result<Answer> {
        let scored = self.retrieve(question).await?;
        compose_answer(question, &scored, model).await
    }
}
