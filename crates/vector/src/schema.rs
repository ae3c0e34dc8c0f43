//! Idempotent collection creation.

use {
    mmrag_common::{Result, types::CollectionDescriptor},
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use mmrag_metrics::{counter, labels, schema as schema_metrics};

use crate::store::VectorStore;

/// Create `descriptor` unless a collection with that name already exists.
/// Returns `true` when it was created.
///
/// An existing collection is left untouched even if its definition differs.
pub async fn ensure_collection(
    store: &dyn VectorStore,
    descriptor: &CollectionDescriptor,
) -> Result<bool> {
    descriptor.validate()?;
    if store.collection_exists(&descriptor.name).await? {
        info!(collection = %descriptor.name, "collection already exists");
        return Ok(false);
    }
    if let Err(e) = store.create_collection(descriptor).await {
        #[cfg(feature = "metrics")]
        counter!(schema_metrics::COLLECTION_CREATE_FAILURES_TOTAL, labels::COLLECTION => descriptor.name.clone())
            .increment(1);
        return Err(e);
    }
    info!(
        collection = %descriptor.name,
        backend = store.name(),
        "created collection"
    );
    #[cfg(feature = "metrics")]
    counter!(schema_metrics::COLLECTIONS_CREATED_TOTAL, labels::COLLECTION => descriptor.name.clone())
        .increment(1);
    Ok(true)
}

#[derive(Debug)]
pub struct CollectionOutcome {
    pub name: String,
    /// `Ok(true)` created, `Ok(false)` already existed.
    pub result: Result<bool>,
}

/// Per-collection results of [`ensure_collections`].
#[derive(Debug, Default)]
pub struct SchemaReport {
    pub outcomes: Vec<CollectionOutcome>,
}

impl SchemaReport {
    pub fn created(&self) -> Vec<&str> {
        self.names_where(|r| matches!(r, Ok(true)))
    }

    pub fn existing(&self) -> Vec<&str> {
        self.names_where(|r| matches!(r, Ok(false)))
    }

    pub fn failed(&self) -> Vec<&CollectionOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err()).collect()
    }

    fn names_where(&self, pred: impl Fn(&Result<bool>) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| pred(&o.result))
            .map(|o| o.name.as_str())
            .collect()
    }
}

/// Ensure every descriptor in order. A failure for one collection is recorded
/// and the rest are still attempted.
pub async fn ensure_collections(
    store: &dyn VectorStore,
    descriptors: &[CollectionDescriptor],
) -> SchemaReport {
    let mut report = SchemaReport::default();
    for descriptor in descriptors {
        let result = ensure_collection(store, descriptor).await;
        if let Err(e) = &result {
            warn!(collection = %descriptor.name, error = %e, "could not ensure collection");
        }
        report.outcomes.push(CollectionOutcome {
            name: descriptor.name.clone(),
            result,
        });
    }
    report
}
