/// Multimodal manager: ties configuration, the vector store and the generator
/// together behind the operations the CLI exposes.
use {
    mmrag_common::{Result, types::CollectionDescriptor},
    mmrag_config::MmragConfig,
    serde::Serialize,
    tracing::{info, warn},
};

use crate::{
    generate::GenerationProvider,
    generate_ollama::OllamaGenerator,
    import::{ImportReport, import_records},
    rag::{AnswerOptions, answer_with_options},
    record::Record,
    schema::{SchemaReport, ensure_collection, ensure_collections},
    search::{self, SearchQuery, SearchResult},
    store::VectorStore,
    store_weaviate::WeaviateStore,
};

pub struct MultimodalManager {
    config: MmragConfig,
    store: Box<dyn VectorStore>,
    generator: Box<dyn GenerationProvider>,
}

/// Results for one collection in a [`MultimodalManager::compare`] run.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionResults {
    pub collection: String,
    /// `false` when the collection does not exist; `results` is then empty.
    pub exists: bool,
    pub results: Vec<SearchResult>,
}

impl MultimodalManager {
    pub fn new(
        config: MmragConfig,
        store: Box<dyn VectorStore>,
        generator: Box<dyn GenerationProvider>,
    ) -> Self {
        Self {
            config,
            store,
            generator,
        }
    }

    /// Connect to the configured Weaviate instance and Ollama endpoint.
    pub async fn connect(config: MmragConfig) -> Result<Self> {
        let store = WeaviateStore::connect(&config).await?;
        let generator = OllamaGenerator::from_config(&config.generation)?;
        Ok(Self::new(config, Box::new(store), Box::new(generator)))
    }

    pub fn config(&self) -> &MmragConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    /// Create every configured collection that does not exist yet.
    pub async fn ensure_collections(&self) -> SchemaReport {
        ensure_collections(self.store.as_ref(), &self.config.collections).await
    }

    pub async fn ensure_collection(&self, descriptor: &CollectionDescriptor) -> Result<bool> {
        ensure_collection(self.store.as_ref(), descriptor).await
    }

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.store.list_collections().await
    }

    /// Import into one collection. `batch_size = None` uses the configured size.
    pub async fn import(
        &self,
        collection: &str,
        records: &[Record],
        batch_size: Option<usize>,
    ) -> Result<ImportReport> {
        let batch_size = batch_size.unwrap_or(self.config.import.batch_size);
        import_records(self.store.as_ref(), collection, records, batch_size).await
    }

    /// Import the same records into every configured collection. A failure in
    /// one collection does not stop the others.
    pub async fn import_into_all(
        &self,
        records: &[Record],
        batch_size: Option<usize>,
    ) -> Vec<(String, Result<ImportReport>)> {
        let mut outcomes = Vec::with_capacity(self.config.collections.len());
        for name in self.config.collection_names() {
            let result = self.import(&name, records, batch_size).await;
            if let Err(e) = &result {
                warn!(collection = %name, error = %e, "import failed");
            }
            outcomes.push((name, result));
        }
        outcomes
    }

    pub async fn search(
        &self,
        collection: &str,
        query: &SearchQuery,
        limit: usize,
        return_properties: Option<&[String]>,
    ) -> Result<Vec<SearchResult>> {
        search::search(
            self.store.as_ref(),
            collection,
            query,
            limit,
            return_properties,
        )
        .await
    }

    /// Run `query` against each collection in `collections` (all configured
    /// collections when empty). Missing collections yield an empty entry.
    pub async fn compare(
        &self,
        collections: &[String],
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<CollectionResults>> {
        let names = if collections.is_empty() {
            self.config.collection_names()
        } else {
            collections.to_vec()
        };
        let mut out = Vec::with_capacity(names.len());
        for collection in names {
            match self.search(&collection, query, limit, None).await {
                Ok(results) => out.push(CollectionResults {
                    collection,
                    exists: true,
                    results,
                }),
                Err(e) if e.is_missing_collection() => {
                    info!(%collection, "collection missing, skipped in comparison");
                    out.push(CollectionResults {
                        collection,
                        exists: false,
                        results: Vec::new(),
                    });
                },
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    /// Retrieval-augmented answer. `limit = None` uses `search.rag_limit`.
    pub async fn answer(
        &self,
        collection: &str,
        query: &SearchQuery,
        question: &str,
        limit: Option<usize>,
    ) -> Result<Option<String>> {
        let options = AnswerOptions {
            limit: limit.unwrap_or(self.config.search.rag_limit),
            attach_images: self.config.generation.attach_images,
        };
        answer_with_options(
            self.store.as_ref(),
            self.generator.as_ref(),
            collection,
            query,
            question,
            options,
        )
        .await
    }

    pub async fn count(&self, collection: &str) -> Result<u64> {
        self.store.count(collection).await
    }
}
