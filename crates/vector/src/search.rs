//! Similarity search by text or by image against one collection.

use std::path::PathBuf;

use {
    mmrag_common::{Error, Result},
    serde::Serialize,
    tracing::{debug, info},
    uuid::Uuid,
};

#[cfg(feature = "metrics")]
use mmrag_metrics::{counter, histogram, labels, search as search_metrics};

use crate::{
    encoder::encode_file_async,
    store::{NearQuery, ObjectProperties, STANDARD_PROPERTIES, VectorStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    Text(String),
    /// Path to a query image, encoded at search time.
    Image(PathBuf),
}

impl SearchQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
        }
    }
}

/// One hit, as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: Uuid,
    /// Distance to the query; smaller is closer. Absent when the store did
    /// not report one.
    pub distance: Option<f32>,
    pub properties: ObjectProperties,
}

/// Run a similarity query against `collection`.
///
/// Results come back in the store's order (closest first) and are not
/// re-sorted. `return_properties = None` requests every standard property the
/// collection declares. A missing collection is [`Error::NotFound`]; an
/// unreadable query image is [`Error::Io`].
pub async fn search(
    store: &dyn VectorStore,
    collection: &str,
    query: &SearchQuery,
    limit: usize,
    return_properties: Option<&[String]>,
) -> Result<Vec<SearchResult>> {
    if let SearchQuery::Text(text) = query
        && text.trim().is_empty()
    {
        return Err(Error::InvalidInput("search text must not be empty".into()));
    }
    if limit == 0 {
        debug!(collection, "search with limit 0, nothing to do");
        return Ok(Vec::new());
    }

    let declared = store
        .collection_properties(collection)
        .await?
        .ok_or_else(|| Error::collection_not_found(collection))?;
    let properties = resolve_return_properties(collection, return_properties, &declared)?;

    let near = match query {
        SearchQuery::Text(text) => NearQuery::Text(text.clone()),
        SearchQuery::Image(path) => {
            NearQuery::Image(encode_file_async(path).await.map_err(Error::into_io)?)
        },
    };

    #[cfg(feature = "metrics")]
    let start = std::time::Instant::now();

    let results = store.near(collection, &near, limit, &properties).await?;

    #[cfg(feature = "metrics")]
    {
        counter!(
            search_metrics::QUERIES_TOTAL,
            labels::COLLECTION => collection.to_string(),
            labels::QUERY_KIND => query.kind()
        )
        .increment(1);
        histogram!(search_metrics::RESULTS_RETURNED, labels::COLLECTION => collection.to_string())
            .record(results.len() as f64);
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "search timing");
    }

    info!(
        collection,
        kind = query.kind(),
        limit,
        results = results.len(),
        "search complete"
    );
    Ok(results)
}

/// Requested properties must be standard properties the collection declares.
fn resolve_return_properties(
    collection: &str,
    requested: Option<&[String]>,
    declared: &[String],
) -> Result<Vec<String>> {
    let is_declared = |name: &str| declared.iter().any(|d| d == name);
    match requested {
        None => Ok(STANDARD_PROPERTIES
            .iter()
            .filter(|&&p| is_declared(p))
            .map(|p| p.to_string())
            .collect()),
        Some(names) => {
            for name in names {
                if !STANDARD_PROPERTIES.contains(&name.as_str()) || !is_declared(name.as_str()) {
                    return Err(Error::InvalidInput(format!(
                        "collection '{collection}' has no returnable property '{name}'"
                    )));
                }
            }
            Ok(names.to_vec())
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{
            import::import_records,
            record::Record,
            schema::ensure_collection,
            store_memory::MemoryVectorStore,
        },
        mmrag_common::types::{CollectionDescriptor, EmbeddingStrategy},
        tempfile::TempDir,
    };

    async fn seeded(texts: &[&str]) -> MemoryVectorStore {
        let store = MemoryVectorStore::new();
        let descriptor = CollectionDescriptor::new("Demo", EmbeddingStrategy::DefaultService);
        ensure_collection(&store, &descriptor).await.unwrap();
        let records: Vec<Record> = texts.iter().map(|t| Record::new(*t)).collect();
        import_records(&store, "Demo", &records, 10).await.unwrap();
        store
    }

    #[tokio::test]
    async fn missing_collection_is_typed_not_found() {
        let store = MemoryVectorStore::new();
        let err = search(&store, "Nope", &SearchQuery::Text("x".into()), 3, None)
            .await
            .unwrap_err();
        assert!(err.is_missing_collection());
    }

    #[tokio::test]
    async fn results_are_in_non_decreasing_distance_order() {
        let store = seeded(&[
            "a city skyline at night",
            "sunset over the ocean",
            "sunset sunset sunset by the lake",
            "a cat on a windowsill",
        ])
        .await;
        let results = search(&store, "Demo", &SearchQuery::Text("sunset ocean".into()), 4, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 4);
        let distances: Vec<f32> = results.iter().map(|r| r.distance.unwrap()).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]), "{distances:?}");
        assert_eq!(
            results[0].properties.text.as_deref(),
            Some("sunset over the ocean")
        );
    }

    #[tokio::test]
    async fn limit_larger_than_collection_returns_what_exists() {
        let store = seeded(&["only one item about mountains"]).await;
        let results = search(&store, "Demo", &SearchQuery::Text("mountains".into()), 3, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn limit_zero_returns_nothing() {
        let store = seeded(&["anything"]).await;
        let results = search(&store, "Demo", &SearchQuery::Text("anything".into()), 0, None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn return_properties_are_projected_and_validated() {
        let store = seeded(&["sushi with fresh fish"]).await;
        let only_text = vec!["text".to_string()];
        let results = search(
            &store,
            "Demo",
            &SearchQuery::Text("sushi".into()),
            1,
            Some(only_text.as_slice()),
        )
        .await
        .unwrap();
        assert_eq!(results[0].properties.present(), vec!["text"]);

        let unknown = vec!["caption".to_string()];
        let err = search(
            &store,
            "Demo",
            &SearchQuery::Text("sushi".into()),
            1,
            Some(unknown.as_slice()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn empty_text_query_is_rejected() {
        let store = seeded(&["anything"]).await;
        let err = search(&store, "Demo", &SearchQuery::Text("  ".into()), 3, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_query_image_is_io_error() {
        let store = seeded(&["anything"]).await;
        let err = search(
            &store,
            "Demo",
            &SearchQuery::Image("/no/such/query.jpg".into()),
            3,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn image_query_finds_the_same_image() {
        let tmp = TempDir::new().unwrap();
        let cat = tmp.path().join("cat.jpg");
        let city = tmp.path().join("city.jpg");
        std::fs::write(&cat, b"cat pixels").unwrap();
        std::fs::write(&city, b"city pixels").unwrap();

        let store = MemoryVectorStore::new();
        let descriptor = CollectionDescriptor::new("Demo", EmbeddingStrategy::DefaultService);
        ensure_collection(&store, &descriptor).await.unwrap();
        let records: Vec<Record> = vec![
            Record::new("a city at night").with_image(&city),
            Record::new("a cat on a windowsill").with_image(&cat),
        ];
        import_records(&store, "Demo", &records, 2).await.unwrap();

        let results = search(&store, "Demo", &SearchQuery::Image(cat.clone()), 2, None)
            .await
            .unwrap();
        assert_eq!(
            results[0].properties.text.as_deref(),
            Some("a cat on a windowsill")
        );
        assert!(results[0].properties.image.is_some());
    }
}
