use serde::{Deserialize, Serialize};

/// A chat model served by Ollama.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatModel {
    pub id: String,
    pub name: String,
    pub default_temperature: f64,
    pub description: String,
}

impl Default for ChatModel {
    fn default() -> Self {
        ChatModel {
            id: "mistral".to_string(),
            name: "Mistral 7B".to_string(),
            default_temperature: 0.2,
            description: "General purpose instruction model".to_string(),
        }
    }
}

/// An embedding model served by Ollama.
///
/// `id` is the tag passed to the Ollama API. `embedding_dim` is the width of
/// every vector the model produces and, by extension, the width of any index
/// built with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingModel {
    pub id: String,
    pub name: String,
    pub embedding_dim: usize,
    #[serde(default)]
    pub description: String,
}

impl Default for EmbeddingModel {
    fn default() -> Self {
        EmbeddingModel {
            id: "all-minilm".to_string(),
            name: "all-MiniLM-L6-v2".to_string(),
            embedding_dim: 384,
            description: "Small sentence-transformers model, fast on CPU".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Model {
    Chat(ChatModel),
    Embedding(EmbeddingModel),
}

impl Model {
    pub fn id(&self) -> &str {
        match self {
            Model::Chat(m) => &m.id,
            Model::Embedding(m) => &m.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Model::Chat(m) => &m.name,
            Model::Embedding(m) => &m.name,
        }
    }
}

/// Well-known models, looked up by Ollama tag.
pub struct ModelRegistry {
    models: Vec<Model>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            models: default_models(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Model> {
        // Ollama treats "name" and "name:latest" as the same model
        let id = id.strip_suffix(":latest").unwrap_or(id);
        self.models.iter().find(|m| m.id() == id)
    }

    pub fn get_embedding(&self, id: &str) -> Option<&EmbeddingModel> {
        self.get(id).and_then(|m| match m {
            Model::Embedding(embed) => Some(embed),
            _ => None,
        })
    }

    pub fn get_chat(&self, id: &str) -> Option<&ChatModel> {
        self.get(id).and_then(|m| match m {
            Model::Chat(chat) => Some(chat),
            _ => None,
        })
    }

    pub fn embedding_models(&self) -> impl Iterator<Item = &EmbeddingModel> {
        self.models.iter().filter_map(|m| match m {
            Model::Embedding(embed) => Some(embed),
            _ => None,
        })
    }

    pub fn all_models(&self) -> &[Model] {
        &self.models
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_models() -> Vec<Model> {
    vec![
        Model::Embedding(EmbeddingModel::default()),
        Model::Embedding(EmbeddingModel {
            id: "nomic-embed-text".to_string(),
            name: "Nomic Embed Text v1.5".to_string(),
            embedding_dim: 768,
            description: "Long-context general purpose embeddings".to_string(),
        }),
        Model::Embedding(EmbeddingModel {
            id: "mxbai-embed-large".to_string(),
            name: "mxbai-embed-large v1".to_string(),
            embedding_dim: 1024,
            description: "Higher quality, slower embeddings".to_string(),
        }),
        Model::Chat(ChatModel::default()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_embedding_model_is_minilm() {
        let model = EmbeddingModel::default();
        assert_eq!(model.id, "all-minilm");
        assert_eq!(model.embedding_dim, 384);
    }

    #[test]
    fn test_get_embedding_directly() {
        let registry = ModelRegistry::new();
        let embed = registry.get_embedding("nomic-embed-text").unwrap();
        assert_eq!(embed.embedding_dim, 768);
    }

    #[test]
    fn test_latest_tag_is_ignored() {
        let registry = ModelRegistry::new();
        assert!(registry.get_embedding("all-minilm:latest").is_some());
        assert!(registry.get_chat("mistral:latest").is_some());
    }

    #[test]
    fn test_chat_model_is_not_an_embedding_model() {
        let registry = ModelRegistry::new();
        assert!(registry.get_embedding("mistral").is_none());
        assert!(registry.get("mistral").is_some());
    }

    #[test]
    fn test_all_embedding_models_have_dimensions() {
        let registry = ModelRegistry::new();
        let embeddings: Vec<_> = registry.embedding_models().collect();
        assert!(!embeddings.is_empty());
        for embed in embeddings {
            assert!(embed.embedding_dim > 0);
        }
    }

    #[test]
    fn test_model_ids_unique() {
        let registry = ModelRegistry::new();
        let ids: Vec<_> = registry.all_models().iter().map(|m| m.id()).collect();
        let mut unique_ids = ids.clone();
        unique_ids.sort();
        unique_ids.dedup();
        assert_eq!(ids.len(), unique_ids.len(), "Model IDs must be unique");
    }
}
