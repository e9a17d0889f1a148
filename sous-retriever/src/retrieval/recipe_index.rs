//! Persisted vector index over recipe chunks.
//!
//! Chunks and their f16 embeddings live in a single SQLite database. The
//! index has exactly two states: a cold build (embed every chunk, store,
//! record build metadata) and a load of an existing build. There is no
//! incremental update path. Whether an existing build is still usable is
//! decided by comparing the stored corpus hash and embedding model id with
//! the current ones; any mismatch triggers a full rebuild.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE chunks (
//!     chunk_id TEXT PRIMARY KEY,     -- "{document_id}_{sequence}"
//!     document_id TEXT,              -- parent document identity key
//!     content TEXT,                  -- chunk text, the embedded input
//!     metadata_json TEXT,            -- serialized RecipeMetadata
//!     embedding BLOB,                -- f16 vector
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//!
//! CREATE TABLE index_metadata (      -- single row
//!     id INTEGER PRIMARY KEY CHECK (id = 1),
//!     corpus_hash BLOB,              -- blake3 of the corpus file
//!     model_id TEXT,                 -- embedding model identifier
//!     dimension INTEGER,
//!     built_at INTEGER
//! );
//! ```

use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::corpus::RecipeMetadata;
use crate::retrieval::chunking::DocumentChunk;
use sous_embed::EmbeddingProvider;

/// A chunk as read back from the index.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub metadata: RecipeMetadata,
}

/// Summary of what the index currently holds.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub chunks_count: usize,
    pub documents_count: usize,
    pub model_id: Option<String>,
    pub built_at: Option<i64>,
}

/// SQLite-backed similarity index over recipe chunks.
#[derive(Clone, Debug)]
pub struct RecipeIndex {
    pool: SqlitePool,
}

impl RecipeIndex {
    /// Open (or create) the persisted index inside `base`.
    pub async fn open(base: &Path) -> Result<Self> {
        std::fs::create_dir_all(base)?;
        let db_path = base.join("sous-index.db");

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .create_if_missing(true)
                .page_size(1 << 16),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// Open an in-memory index, used by tests.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS index_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                corpus_hash BLOB NOT NULL,
                model_id TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                built_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Whether the existing build matches this corpus hash and model id.
    pub async fn is_current(&self, corpus_hash: &[u8; 32], model_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT corpus_hash, model_id FROM index_metadata WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let stored_hash: Vec<u8> = row.get("corpus_hash");
                let stored_model: String = row.get("model_id");
                Ok(stored_hash == corpus_hash && stored_model == model_id)
            }
            None => Ok(false),
        }
    }

    /// Build the index from `chunks`, or reuse the existing build.
    ///
    /// If the persisted build matches `corpus_hash` and `model_id`, the
    /// chunks argument is ignored and nothing is embedded. Otherwise the
    /// store is wiped, every chunk is embedded, and the build metadata is
    /// recorded. Returns true when a rebuild happened.
    pub async fn ensure_built(
        &self,
        chunks: &[DocumentChunk],
        provider: &dyn EmbeddingProvider,
        corpus_hash: [u8; 32],
        model_id: &str,
    ) -> Result<bool> {
        if self.is_current(&corpus_hash, model_id).await? {
            tracing::info!("Reusing persisted index (corpus and model unchanged)");
            return Ok(false);
        }

        tracing::info!("Building index: embedding {} chunks", chunks.len());
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embedded = provider.embed_texts(&texts).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM index_metadata")
            .execute(&mut *tx)
            .await?;

        for (chunk, embedding) in chunks.iter().zip(embedded.embeddings.iter()) {
            let embedding_bytes = bytemuck::cast_slice::<half::f16, u8>(embedding);
            sqlx::query(
                r#"
                INSERT INTO chunks (chunk_id, document_id, content, metadata_json, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(&chunk.content)
            .bind(chunk.metadata.to_json()?)
            .bind(embedding_bytes)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO index_metadata (id, corpus_hash, model_id, dimension, built_at)
            VALUES (1, ?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&corpus_hash[..])
        .bind(model_id)
        .bind(embedded.dimension as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!("Index built: {} chunks stored", chunks.len());
        Ok(true)
    }

    /// Return the `limit` chunks nearest to `query_embedding` by cosine
    /// similarity, best first. Brute force over all stored vectors; the
    /// corpus is small enough that a vector database would be overkill.
    pub async fn search_similar(
        &self,
        query_embedding: &[half::f16],
        limit: usize,
    ) -> Result<Vec<StoredChunk>> {
        let rows = sqlx::query(
            "SELECT chunk_id, document_id, content, metadata_json, embedding FROM chunks ORDER BY chunk_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut similarities: Vec<(f32, StoredChunk)> = Vec::new();

        for row in rows {
            let chunk_id: String = row.get("chunk_id");
            let document_id: String = row.get("document_id");
            let content: String = row.get("content");
            let metadata_json: String = row.get("metadata_json");
            let embedding_bytes: Vec<u8> = row.get("embedding");

            let chunk_embedding = bytemuck::cast_slice::<u8, half::f16>(&embedding_bytes);
            let similarity = cosine_similarity(query_embedding, chunk_embedding);

            similarities.push((
                similarity,
                StoredChunk {
                    chunk_id,
                    document_id,
                    content,
                    metadata: RecipeMetadata::from_json_lossy(&metadata_json),
                },
            ));
        }

        similarities.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        similarities.truncate(limit);

        Ok(similarities.into_iter().map(|(_, chunk)| chunk).collect())
    }

    /// Summary counts plus build metadata, if any build exists.
    pub async fn stats(&self) -> Result<IndexStats> {
        let chunks_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let documents_count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT document_id) FROM chunks")
                .fetch_one(&self.pool)
                .await?;

        let metadata_row = sqlx::query("SELECT model_id, built_at FROM index_metadata WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        let (model_id, built_at) = match metadata_row {
            Some(row) => (Some(row.get("model_id")), Some(row.get("built_at"))),
            None => (None, None),
        };

        Ok(IndexStats {
            chunks_count: chunks_count as usize,
            documents_count: documents_count as usize,
            model_id,
            built_at,
        })
    }
}

/// Cosine similarity between two f16 vectors. Mismatched or zero-norm
/// vectors score 0.
fn cosine_similarity(a: &[half::f16], b: &[half::f16]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f32::from(*x) * f32::from(*y))
        .sum();

    let norm_a: f32 = a.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
