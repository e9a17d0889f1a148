//! The retrieval pipeline: chunking, the persisted vector index, and
//! two-stage query-time retrieval.

pub mod chunking;
pub mod recipe_index;
pub mod retriever;
