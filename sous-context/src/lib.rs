//! Text chunking utilities for retrieval pipelines.
//!
//! This crate turns a document's free text into bounded, overlapping chunks
//! suitable for embedding models. Splitting prefers natural boundaries
//! (paragraphs, then lines, then sentences, then words) and only passes an
//! oversized run through unchanged when no boundary exists inside it.

pub mod text;

pub use text::{RECIPE_DELIMITERS, SplitError, TextChunk, TextSplitter};
