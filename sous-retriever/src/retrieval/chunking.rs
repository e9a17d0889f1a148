//! Splitting recipe documents into embeddable chunks.

use crate::corpus::{Document, RecipeMetadata};
use anyhow::{Context, Result};
use sous_context::{RECIPE_DELIMITERS, TextSplitter};

/// Configuration for chunking documents
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum size of each chunk in characters
    pub max_chunk_size: usize,
    /// Characters of trailing context carried into the next chunk
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 500,
            overlap: 50,
        }
    }
}

impl ChunkingConfig {
    pub fn new(max_chunk_size: usize, overlap: usize) -> Self {
        Self {
            max_chunk_size,
            overlap,
        }
    }
}

/// A bounded piece of one document's content, carrying a full copy of the
/// parent document's metadata. Chunks are the unit that gets embedded,
/// stored, and searched; the parent document is never mutated.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    /// `{document_id}_{index}`
    pub id: String,
    /// Identity key of the parent document
    pub document_id: String,
    pub content: String,
    pub metadata: RecipeMetadata,
}

/// Split every document into chunks, preserving document order.
///
/// Each non-empty document yields at least one chunk, so the output is never
/// shorter than the input.
pub fn chunk_documents(
    documents: &[Document],
    config: &ChunkingConfig,
) -> Result<Vec<DocumentChunk>> {
    let splitter = TextSplitter::new(RECIPE_DELIMITERS, config.max_chunk_size, config.overlap)
        .context("invalid chunking configuration")?;

    let mut chunks = Vec::new();
    for document in documents {
        for text_chunk in splitter.split(&document.content) {
            chunks.push(DocumentChunk {
                id: format!("{}_{}", document.metadata.id, text_chunk.sequence),
                document_id: document.metadata.id.clone(),
                content: text_chunk.text,
                metadata: document.metadata.clone(),
            });
        }
    }

    tracing::info!(
        "Chunked {} documents into {} chunks (max size: {}, overlap: {})",
        documents.len(),
        chunks.len(),
        config.max_chunk_size,
        config.overlap
    );
    Ok(chunks)
}
