//! Configuration for the embedding and reranking models.

use serde::{Deserialize, Serialize};

/// Configuration shared by the embedding and reranking providers.
///
/// The model names are informational identifiers recorded alongside a built
/// index; the actual model weights are the fastembed built-ins selected by
/// the providers. Changing either name invalidates a persisted index, since
/// vectors from different models are not comparable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedConfig {
    /// Name of the sentence embedding model
    pub embedding_model: String,
    /// Name of the cross-encoder reranking model
    pub reranker_model: String,
    /// Maximum batch size for embedding generation
    pub batch_size: usize,
    /// Whether to normalize embeddings to unit length
    pub normalize: bool,
}

impl EmbedConfig {
    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Identifier recorded in the index metadata, covering every property
    /// that makes stored vectors incompatible when it changes.
    pub fn model_id(&self) -> String {
        let normalized_part = if self.normalize { "norm" } else { "raw" };
        format!("fastembed:{}:{}", self.embedding_model, normalized_part)
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            reranker_model: "BAAI/bge-reranker-base".to_string(),
            batch_size: 16,
            normalize: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbedConfig::default();
        assert_eq!(
            config.embedding_model,
            "sentence-transformers/all-MiniLM-L6-v2"
        );
        assert_eq!(config.batch_size, 16);
        assert!(config.normalize);
    }

    #[test]
    fn test_builder_methods() {
        let config = EmbedConfig::default()
            .with_batch_size(64)
            .with_normalize(false);

        assert_eq!(config.batch_size, 64);
        assert!(!config.normalize);
        assert!(config.model_id().ends_with(":raw"));
    }

    #[test]
    fn test_model_id_changes_with_model_name() {
        let a = EmbedConfig::default();
        let b = EmbedConfig {
            embedding_model: "some-other-model".to_string(),
            ..EmbedConfig::default()
        };
        assert_ne!(a.model_id(), b.model_id());
    }
}
