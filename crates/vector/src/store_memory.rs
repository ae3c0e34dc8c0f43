/// In-process vector store with bag-of-words vectors. Ranking is lexical,
/// not semantic.
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use {
    async_trait::async_trait,
    mmrag_common::{
        Error, Result,
        types::{CollectionDescriptor, ExternalProvider},
    },
    tokio::sync::RwLock,
    uuid::Uuid,
};

use crate::{
    search::SearchResult,
    store::{BatchOutcome, NearQuery, ObjectProperties, VectorStore},
};

type SparseVector = BTreeMap<String, f32>;

struct StoredObject {
    id: Uuid,
    properties: ObjectProperties,
    vector: SparseVector,
}

struct MemoryCollection {
    descriptor: CollectionDescriptor,
    objects: Vec<StoredObject>,
}

/// Call counters, for asserting how often the store was hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub create_calls: usize,
    pub insert_calls: usize,
    pub objects_submitted: usize,
}

#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
    credentials: HashSet<ExternalProvider>,
    reject_marker: Option<String>,
    create_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    objects_submitted: AtomicUsize,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept collections that embed through `provider`. Without this,
    /// creating such a collection fails with [`Error::Auth`].
    pub fn with_external_credentials(mut self, provider: ExternalProvider) -> Self {
        self.credentials.insert(provider);
        self
    }

    /// Refuse any object whose text contains `marker`, as a per-object batch
    /// failure.
    pub fn reject_objects_containing(mut self, marker: impl Into<String>) -> Self {
        self.reject_marker = Some(marker.into());
        self
    }

    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            create_calls: self.create_calls.load(Ordering::Relaxed),
            insert_calls: self.insert_calls.load(Ordering::Relaxed),
            objects_submitted: self.objects_submitted.load(Ordering::Relaxed),
        }
    }

    fn rejects(&self, object: &ObjectProperties) -> Option<String> {
        let marker = self.reject_marker.as_deref()?;
        object
            .text
            .as_deref()
            .filter(|t| t.contains(marker))
            .map(|_| format!("object rejected: text contains '{marker}'"))
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn vectorize(properties: &ObjectProperties) -> SparseVector {
    let mut vector = SparseVector::new();
    if let Some(text) = &properties.text {
        for token in tokens(text) {
            *vector.entry(token).or_default() += 1.0;
        }
    }
    if let Some(image) = &properties.image {
        *vector.entry(format!("image:{image}")).or_default() += 1.0;
    }
    vector
}

fn query_vector(query: &NearQuery) -> SparseVector {
    match query {
        NearQuery::Text(text) => vectorize(&ObjectProperties {
            text: Some(text.clone()),
            ..Default::default()
        }),
        NearQuery::Image(image) => vectorize(&ObjectProperties {
            image: Some(image.clone()),
            ..Default::default()
        }),
    }
}

/// Cosine distance; vectors with no overlap (or no terms) are at 1.0.
fn cosine_distance(a: &SparseVector, b: &SparseVector) -> f32 {
    let dot: f32 = a
        .iter()
        .filter_map(|(k, va)| b.get(k).map(|vb| va * vb))
        .sum();
    let norm = |v: &SparseVector| v.values().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return 1.0;
    }
    1.0 - dot / denom
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn collection_properties(&self, collection: &str) -> Result<Option<Vec<String>>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| c.descriptor.property_names()))
    }

    async fn create_collection(&self, descriptor: &CollectionDescriptor) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(provider) = descriptor.embedding.external_provider()
            && !self.credentials.contains(&provider)
        {
            return Err(Error::auth(
                provider.name(),
                format!("no {} configured", provider.env_var()),
            ));
        }
        let mut collections = self.collections.write().await;
        if collections.contains_key(&descriptor.name) {
            return Err(Error::InvalidInput(format!(
                "collection '{}' already exists",
                descriptor.name
            )));
        }
        collections.insert(descriptor.name.clone(), MemoryCollection {
            descriptor: descriptor.clone(),
            objects: Vec::new(),
        });
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn insert_objects(
        &self,
        collection: &str,
        objects: &[ObjectProperties],
    ) -> Result<BatchOutcome> {
        self.insert_calls.fetch_add(1, Ordering::Relaxed);
        self.objects_submitted
            .fetch_add(objects.len(), Ordering::Relaxed);

        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| Error::collection_not_found(collection))?;

        let mut outcome = BatchOutcome::default();
        for (index, object) in objects.iter().enumerate() {
            if let Some(undeclared) = object
                .present()
                .into_iter()
                .find(|name| !target.descriptor.declares(name))
            {
                outcome
                    .failures
                    .push((index, format!("no such prop with name '{undeclared}'")));
                continue;
            }
            if let Some(reason) = self.rejects(object) {
                outcome.failures.push((index, reason));
                continue;
            }
            target.objects.push(StoredObject {
                id: Uuid::new_v4(),
                properties: object.clone(),
                vector: vectorize(object),
            });
        }
        Ok(outcome)
    }

    async fn near(
        &self,
        collection: &str,
        query: &NearQuery,
        limit: usize,
        return_properties: &[String],
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| Error::collection_not_found(collection))?;

        let anchor = query_vector(query);
        let mut scored: Vec<(f32, &StoredObject)> = target
            .objects
            .iter()
            .map(|o| (cosine_distance(&anchor, &o.vector), o))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(distance, o)| SearchResult {
                id: o.id,
                distance: Some(distance),
                properties: o.properties.clone().project(return_properties),
            })
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|c| c.objects.len() as u64)
            .ok_or_else(|| Error::collection_not_found(collection))
    }
}
