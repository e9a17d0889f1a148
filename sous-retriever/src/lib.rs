//! Retrieval-augmented recipe question answering.
//!
//! The crate turns a JSON recipe corpus into a queryable assistant:
//!
//! 1. [`corpus`] loads recipe records and renders each into a text document
//!    with typed metadata.
//! 2. [`retrieval::chunking`] splits documents into bounded, overlapping
//!    chunks along recipe structure.
//! 3. [`retrieval::recipe_index`] embeds chunks and persists them in SQLite,
//!    rebuilding only when the corpus or model changes.
//! 4. [`retrieval::retriever`] answers queries in two stages: vector
//!    similarity shortlists candidates, a cross-encoder reranks them.
//! 5. [`answer`] renders the winners into a context block and asks a chat
//!    model for the final answer.
//!
//! [`pipeline::RecipePipeline`] wires the stages together behind one value.

pub mod answer;
pub mod corpus;
pub mod pipeline;
pub mod retrieval;

pub use answer::{Answer, ChatModel, GroqClient};
pub use corpus::{Document, RecipeMetadata, load_recipes};
pub use pipeline::{PipelineConfig, RecipePipeline};
pub use retrieval::chunking::ChunkingConfig;
pub use retrieval::retriever::{RetrieverConfig, ScoredChunk};
