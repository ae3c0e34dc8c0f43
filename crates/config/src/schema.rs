use std::{fmt, time::Duration};

use {
    mmrag_common::types::{CollectionDescriptor, EmbeddingStrategy, ExternalProvider},
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MmragConfig {
    pub store: StoreConfig,
    pub generation: GenerationConfig,
    pub embedding: EmbeddingConfig,
    pub import: ImportConfig,
    pub search: SearchConfig,
    /// Collection used when a command does not name one.
    pub default_collection: String,
    /// Collections created by `mmrag schema` and targeted by `--all` commands.
    pub collections: Vec<CollectionDescriptor>,
}

impl Default for MmragConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            generation: GenerationConfig::default(),
            embedding: EmbeddingConfig::default(),
            import: ImportConfig::default(),
            search: SearchConfig::default(),
            default_collection: CLIP_COLLECTION.into(),
            collections: default_collections(),
        }
    }
}

impl MmragConfig {
    pub fn collection(&self, name: &str) -> Option<&CollectionDescriptor> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections.iter().map(|c| c.name.clone()).collect()
    }

    /// API key for `provider`, if one is configured.
    pub fn provider_key(&self, provider: ExternalProvider) -> Option<Secret<String>> {
        match provider {
            ExternalProvider::Cohere => self.embedding.cohere_api_key.clone().map(Secret::new),
        }
    }
}

const CLIP_COLLECTION: &str = "MultimodalData_CLIP_ViT_B_32";
const QWEN_COLLECTION: &str = "MultimodalData_Qwen_VL";
const COHERE_COLLECTION: &str = "MultimodalData_Cohere_Vision";

/// CLIP on the built-in service, Qwen-VL on a self-hosted transformers
/// service, and Cohere Vision through the Cohere API.
pub fn default_collections() -> Vec<CollectionDescriptor> {
    vec![
        CollectionDescriptor::new(CLIP_COLLECTION, EmbeddingStrategy::DefaultService)
            .with_description("Multimodal data embedded with CLIP ViT-B-32"),
        CollectionDescriptor::new(QWEN_COLLECTION, EmbeddingStrategy::SelfHostedUrl {
            inference_url: "http://multi2vec-transformers-qwen:8080".into(),
        })
        .with_description("Multimodal data embedded with Qwen-VL (HuggingFace Transformers)"),
        CollectionDescriptor::new(COHERE_COLLECTION, EmbeddingStrategy::ExternalApi {
            provider: ExternalProvider::Cohere,
            model: "embed-v4.0".into(),
        })
        .with_description("Multimodal data embedded with Cohere Vision (embed-v4.0)"),
    ]
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    /// Bearer key for stores with authentication enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn api_key(&self) -> Option<Secret<String>> {
        self.api_key.clone().map(Secret::new)
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of the Ollama server.
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Forward retrieved images to the model (vision-capable models only).
    pub attach_images: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            timeout_secs: 30,
            attach_images: false,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohere_api_key: Option<String>,
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field(
                "cohere_api_key",
                &self.cohere_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result count for `search` and `compare`.
    pub limit: usize,
    /// Result count used as grounding context by `ask`.
    pub rag_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            rag_limit: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn defaults_match_local_services() {
        let config = MmragConfig::default();
        assert_eq!(config.store.url, "http://localhost:8080");
        assert_eq!(config.generation.endpoint, "http://localhost:11434");
        assert_eq!(config.generation.model, "llama3.2");
        assert_eq!(config.store.timeout(), Duration::from_secs(30));
        assert_eq!(config.import.batch_size, 10);
        assert_eq!(config.collections.len(), 3);
        assert!(config.collection(&config.default_collection).is_some());
    }

    #[test]
    fn default_collections_cover_every_strategy() {
        let collections = default_collections();
        assert_eq!(collections[0].embedding, EmbeddingStrategy::DefaultService);
        assert!(matches!(
            collections[1].embedding,
            EmbeddingStrategy::SelfHostedUrl { .. }
        ));
        assert_eq!(
            collections[2].embedding.external_provider(),
            Some(ExternalProvider::Cohere)
        );
    }

    #[test]
    fn debug_redacts_keys() {
        let mut config = MmragConfig::default();
        config.store.api_key = Some("store-secret".into());
        config.embedding.cohere_api_key = Some("cohere-secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("store-secret"));
        assert!(!rendered.contains("cohere-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn provider_key_is_wrapped() {
        let mut config = MmragConfig::default();
        assert!(config.provider_key(ExternalProvider::Cohere).is_none());
        config.embedding.cohere_api_key = Some("k".into());
        let key = config.provider_key(ExternalProvider::Cohere);
        assert_eq!(key.as_ref().map(|k| k.expose_secret().as_str()), Some("k"));
    }
}
