//! Embedding and reranking model providers for the sous retrieval pipeline.
//!
//! Two model roles live here, both served by ONNX models through
//! [fastembed](https://docs.rs/fastembed):
//!
//! - [`EmbeddingProvider`] turns text into fixed-length vectors for
//!   similarity search. The stock implementation, [`FastEmbedProvider`],
//!   wraps the all-MiniLM-L6-v2 sentence embedding model.
//! - [`RerankProvider`] jointly scores a query against candidate passages
//!   with a cross-encoder, used as the second retrieval stage.
//!   [`FastEmbedReranker`] wraps the BGE reranker.
//!
//! Both traits are object-safe seams so the retrieval pipeline can be
//! exercised in tests without downloading model weights.

pub mod config;
pub mod error;
pub mod provider;
pub mod rerank;

pub use config::EmbedConfig;
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
pub use rerank::{FastEmbedReranker, RerankProvider, RerankScore};
