/// Vector store abstraction: the operations the schema manager, importer and
/// search need from the external database.
use async_trait::async_trait;
use {
    mmrag_common::{
        Result,
        types::{CollectionDescriptor, IMAGE_PROPERTY, METADATA_PROPERTY, TEXT_PROPERTY},
    },
    serde::{Deserialize, Serialize},
};

use crate::search::SearchResult;

/// Property names an [`ObjectProperties`] can carry.
pub const STANDARD_PROPERTIES: [&str; 3] = [TEXT_PROPERTY, IMAGE_PROPERTY, METADATA_PROPERTY];

/// Properties of one stored object. Absent fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64-encoded image bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Serialized JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl ObjectProperties {
    /// Clear every field whose property is not in `declared`. Returns the
    /// names of the fields that were dropped.
    pub fn retain_declared(&mut self, declared: &[String]) -> Vec<&'static str> {
        let is_declared = |name: &str| declared.iter().any(|d| d == name);
        let mut dropped = Vec::new();
        for (name, field) in [
            (TEXT_PROPERTY, &mut self.text),
            (IMAGE_PROPERTY, &mut self.image),
            (METADATA_PROPERTY, &mut self.metadata),
        ] {
            if field.is_some() && !is_declared(name) {
                *field = None;
                dropped.push(name);
            }
        }
        dropped
    }

    /// Keep only the fields listed in `names`.
    pub fn project(mut self, names: &[String]) -> Self {
        let wanted = |name: &str| names.iter().any(|n| n == name);
        if !wanted(TEXT_PROPERTY) {
            self.text = None;
        }
        if !wanted(IMAGE_PROPERTY) {
            self.image = None;
        }
        if !wanted(METADATA_PROPERTY) {
            self.metadata = None;
        }
        self
    }

    /// Names of the fields that are present.
    pub fn present(&self) -> Vec<&'static str> {
        [
            (TEXT_PROPERTY, self.text.is_some()),
            (IMAGE_PROPERTY, self.image.is_some()),
            (METADATA_PROPERTY, self.metadata.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }

    /// Metadata parsed back into JSON, when present and well-formed.
    pub fn metadata_json(&self) -> Option<serde_json::Value> {
        self.metadata
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok())
    }
}

/// What a similarity query is anchored on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NearQuery {
    Text(String),
    /// Base64-encoded image.
    Image(String),
}

impl NearQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
        }
    }
}

/// Result of writing one batch: objects the store refused, by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub failures: Vec<(usize, String)>,
}

impl BatchOutcome {
    pub fn accepted(&self, submitted: usize) -> usize {
        submitted.saturating_sub(self.failed(submitted))
    }

    /// Failures that refer to a submitted position.
    pub fn failed(&self, submitted: usize) -> usize {
        self.failures.iter().filter(|(i, _)| *i < submitted).count()
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Declared property names of `collection`, or `None` when it does not exist.
    async fn collection_properties(&self, collection: &str) -> Result<Option<Vec<String>>>;

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.collection_properties(collection).await?.is_some())
    }

    async fn create_collection(&self, descriptor: &CollectionDescriptor) -> Result<()>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Write `objects` in one request. Per-object rejections are reported in
    /// the outcome; only whole-request failures are errors.
    async fn insert_objects(
        &self,
        collection: &str,
        objects: &[ObjectProperties],
    ) -> Result<BatchOutcome>;

    /// Nearest neighbours of `query`, closest first, at most `limit`.
    async fn near(
        &self,
        collection: &str,
        query: &NearQuery,
        limit: usize,
        return_properties: &[String],
    ) -> Result<Vec<SearchResult>>;

    /// Total number of objects in `collection`.
    async fn count(&self, collection: &str) -> Result<u64>;
}
