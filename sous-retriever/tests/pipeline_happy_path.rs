//! End-to-end pipeline tests using stub model providers.
//!
//! The stubs are deliberately crude but deterministic: a bag-of-words
//! hashing embedder and a token-overlap reranker. They preserve the one
//! property the pipeline depends on (texts about the same dish score
//! closer than texts about different dishes) without downloading any
//! model weights.

use anyhow::Result;
use async_trait::async_trait;
use half::f16;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::sync::Arc;

use sous_retriever::answer::{ChatModel, render_context};
use sous_retriever::retrieval::retriever::dedup_by_document;
use sous_retriever::{PipelineConfig, RecipePipeline};
use sous_embed::{
    EmbeddingProvider, EmbeddingResult, RerankProvider, RerankScore, Result as EmbedResult,
};

struct HashingEmbedder;

impl HashingEmbedder {
    fn embed(text: &str) -> Vec<f16> {
        let mut counts = [0f32; 64];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            counts[(hasher.finish() % 64) as usize] += 1.0;
        }
        let norm: f32 = counts.iter().map(|x| x * x).sum::<f32>().sqrt();
        counts
            .iter()
            .map(|&x| f16::from_f32(if norm > 0.0 { x / norm } else { 0.0 }))
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_text(&self, text: &str) -> EmbedResult<Vec<f16>> {
        Ok(Self::embed(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> EmbedResult<EmbeddingResult> {
        Ok(EmbeddingResult::new(
            texts.iter().map(|t| Self::embed(t)).collect(),
        ))
    }

    fn embedding_dimension(&self) -> usize {
        64
    }

    fn provider_name(&self) -> &str {
        "hashing-test-embedder"
    }
}

struct OverlapReranker;

#[async_trait]
impl RerankProvider for OverlapReranker {
    async fn rerank(&self, query: &str, passages: &[String]) -> EmbedResult<Vec<RerankScore>> {
        let query_tokens: Vec<String> = query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();

        Ok(passages
            .iter()
            .enumerate()
            .map(|(index, passage)| {
                let lower = passage.to_lowercase();
                let score = query_tokens.iter().filter(|t| lower.contains(*t)).count();
                RerankScore {
                    index,
                    score: score as f32,
                }
            })
            .collect())
    }

    fn provider_name(&self) -> &str {
        "overlap-test-reranker"
    }
}

/// Replies with a fixed answer and records nothing. The pipeline's job ends
/// at producing a grounded prompt; what the model says is its own business.
struct CannedModel;

#[async_trait]
impl ChatModel for CannedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        assert!(prompt.contains("Context:"), "prompt must carry the context");
        Ok("Cook the rice in the tomato sauce.".to_string())
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

const CORPUS: &str = r#"[
    {
        "dish_name": "Jollof Rice",
        "origin": "Nigeria",
        "prep_time": "PT15M",
        "cook_time": "PT45M",
        "servings": 4,
        "ingredients": ["long-grain rice", "tomato paste", "scotch bonnet pepper"],
        "steps": ["Blend the tomato and pepper into a sauce", "Simmer the rice in the sauce until tender"],
        "notes": "Let the bottom crisp for party-style smokiness."
    },
    {
        "dish_name": "Lamb Tagine",
        "origin": "Morocco",
        "ingredients": ["lamb shoulder", "dried apricots", "ras el hanout"],
        "steps": ["Brown the lamb", "Slow cook with apricots and spices"]
    },
    {
        "dish_name": "Sukuma Wiki",
        "origin": "Kenya",
        "ingredients": ["collard greens", "onion", "tomato"],
        "steps": ["Fry the onion", "Wilt the greens with tomato"]
    }
]"#;

struct Setup {
    _corpus: tempfile::NamedTempFile,
    _index_dir: tempfile::TempDir,
    config: PipelineConfig,
}

fn setup() -> Setup {
    let mut corpus = tempfile::NamedTempFile::new().unwrap();
    corpus.write_all(CORPUS.as_bytes()).unwrap();
    let index_dir = tempfile::TempDir::new().unwrap();
    let config = PipelineConfig::new(corpus.path(), index_dir.path());
    Setup {
        config,
        _corpus: corpus,
        _index_dir: index_dir,
    }
}

async fn build(config: PipelineConfig) -> RecipePipeline {
    RecipePipeline::build(config, Arc::new(HashingEmbedder), Arc::new(OverlapReranker))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_ask_answers_from_the_right_recipe() {
    let setup = setup();
    let pipeline = build(setup.config).await;
    assert!(pipeline.rebuilt());

    let retrieved = pipeline.retrieve("How do I make Jollof Rice?").await.unwrap();
    assert!(!retrieved.is_empty());
    assert!(retrieved.len() <= 3);
    assert_eq!(retrieved[0].chunk.metadata.dish_name, "Jollof Rice");

    let context = render_context(&retrieved);
    assert!(context.contains("long-grain rice"));
    assert!(context.contains("tomato"));
    assert!(context.contains("1. Blend the tomato and pepper into a sauce"));
    assert!(context.contains("2. Simmer the rice in the sauce until tender"));

    let answer = pipeline
        .ask("How do I make Jollof Rice?", &CannedModel)
        .await
        .unwrap();
    assert_eq!(answer.text, "Cook the rice in the tomato sauce.");
    assert_eq!(answer.sources[0], "Jollof Rice");
}

#[tokio::test]
async fn test_rebuild_skipped_when_corpus_unchanged() {
    let setup = setup();

    let first = build(setup.config.clone()).await;
    assert!(first.rebuilt());
    drop(first);

    let second = build(setup.config.clone()).await;
    assert!(!second.rebuilt(), "unchanged corpus must reuse the index");

    // The reloaded index answers queries just like the fresh one.
    let retrieved = second.retrieve("slow cooked lamb with apricots").await.unwrap();
    assert_eq!(retrieved[0].chunk.metadata.dish_name, "Lamb Tagine");
}

#[tokio::test]
async fn test_corpus_edit_triggers_rebuild() {
    let mut corpus = tempfile::NamedTempFile::new().unwrap();
    corpus.write_all(CORPUS.as_bytes()).unwrap();
    let index_dir = tempfile::TempDir::new().unwrap();
    let config = PipelineConfig::new(corpus.path(), index_dir.path());

    build(config.clone()).await;

    // Any byte change to the corpus file invalidates the build.
    std::fs::write(
        corpus.path(),
        br#"[{"dish_name": "Jollof Rice", "origin": "Nigeria"}]"#,
    )
    .unwrap();

    let rebuilt = build(config).await;
    assert!(rebuilt.rebuilt());
    assert_eq!(rebuilt.documents().len(), 1);
    assert_eq!(rebuilt.stats().await.unwrap().documents_count, 1);
}

#[tokio::test]
async fn test_retrieval_bounds_and_dedup() {
    let setup = setup();
    let pipeline = build(setup.config).await;

    let retrieved = pipeline
        .retrieve("rice tomato lamb greens onion")
        .await
        .unwrap();
    assert!(retrieved.len() <= 3);
    for pair in retrieved.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let deduped = dedup_by_document(&retrieved);
    let mut dishes: Vec<&str> = deduped
        .iter()
        .map(|s| s.chunk.metadata.dish_name.as_str())
        .collect();
    dishes.sort_unstable();
    dishes.dedup();
    assert_eq!(dishes.len(), deduped.len(), "sources must be distinct dishes");
}

#[tokio::test]
async fn test_missing_corpus_is_fatal() {
    let index_dir = tempfile::TempDir::new().unwrap();
    let config = PipelineConfig::new("/nonexistent/recipes.json", index_dir.path());

    let result =
        RecipePipeline::build(config, Arc::new(HashingEmbedder), Arc::new(OverlapReranker)).await;
    assert!(result.is_err());
}
