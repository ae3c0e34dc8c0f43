/// Weaviate-backed [`VectorStore`] over the REST and GraphQL APIs.
use std::{collections::HashMap, time::Duration};

use {
    async_trait::async_trait,
    mmrag_common::{
        Error, Result,
        types::{
            CollectionDescriptor, EmbeddingStrategy, ExternalProvider, METADATA_PROPERTY, PropertyKind,
        },
    },
    mmrag_config::MmragConfig,
    reqwest::{Method, RequestBuilder, Response, StatusCode},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::{debug, info},
    uuid::Uuid,
};

use crate::{
    search::SearchResult,
    store::{BatchOutcome, NearQuery, ObjectProperties, STANDARD_PROPERTIES, VectorStore},
};

const SERVICE: &str = "vector store";
const MULTIMODAL_MODULE: &str = "multi2vec-clip";

pub struct WeaviateStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    module_keys: HashMap<ExternalProvider, Secret<String>>,
}

impl WeaviateStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::upstream(SERVICE, e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            module_keys: HashMap::new(),
        })
    }

    /// Bearer key for instances with authentication enabled.
    pub fn with_api_key(mut self, key: Secret<String>) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Key forwarded to the vectorizer module of `provider`.
    pub fn with_provider_key(mut self, provider: ExternalProvider, key: Secret<String>) -> Self {
        self.module_keys.insert(provider, key);
        self
    }

    /// Build a client from configuration without contacting the server.
    pub fn from_config(config: &MmragConfig) -> Result<Self> {
        let mut store = Self::new(&config.store.url, config.store.timeout())?;
        if let Some(key) = config.store.api_key() {
            store = store.with_api_key(key);
        }
        if let Some(key) = config.provider_key(ExternalProvider::Cohere) {
            store = store.with_provider_key(ExternalProvider::Cohere, key);
        }
        Ok(store)
    }

    /// Build from configuration and check the server is ready.
    pub async fn connect(config: &MmragConfig) -> Result<Self> {
        let store = Self::from_config(config)?;
        store.ready().await?;
        info!(url = %store.base_url, "connected to vector store");
        Ok(store)
    }

    pub async fn ready(&self) -> Result<()> {
        let response = self.send(Method::GET, "/v1/.well-known/ready", None).await?;
        check(response).await.map(|_| ())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        for (provider, key) in &self.module_keys {
            builder = builder.header(provider.key_header(), key.expose_secret());
        }
        builder
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder.send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("{}{path} timed out", self.base_url)
            } else {
                format!("{}{path}: {e}", self.base_url)
            };
            Error::upstream(SERVICE, reason)
        })
    }

    /// Run a GraphQL query and return its `data` member.
    async fn graphql(&self, query: String) -> Result<Value> {
        debug!(query_len = query.len(), "graphql query");
        let response = self
            .send(Method::POST, "/v1/graphql", Some(&json!({ "query": query })))
            .await?;
        let body: GraphqlResponse = check(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("malformed graphql response: {e}")))?;
        if let Some(errors) = body.errors
            && !errors.is_empty()
        {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::upstream(SERVICE, messages.join("; ")));
        }
        body.data
            .ok_or_else(|| Error::upstream(SERVICE, "graphql response without data"))
    }
}

/// Map a non-success status to an error, keeping the server's message.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().path().to_string();
    let text = response.text().await.unwrap_or_default();
    let detail = error_messages(&text).unwrap_or(text);
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::auth("weaviate", detail),
        _ => Error::upstream(SERVICE, format!("{status} from {url}: {detail}")),
    })
}

/// Weaviate reports errors as `{"error": [{"message": ...}]}`.
fn error_messages(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let messages: Vec<&str> = value
        .get("error")?
        .as_array()?
        .iter()
        .filter_map(|e| e.get("message")?.as_str())
        .collect();
    (!messages.is_empty()).then(|| messages.join("; "))
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
struct ClassSchema {
    #[serde(default)]
    properties: Vec<PropertySchema>,
}

#[derive(Deserialize)]
struct PropertySchema {
    name: String,
}

#[derive(Deserialize)]
struct SchemaList {
    #[serde(default)]
    classes: Vec<ClassName>,
}

#[derive(Deserialize)]
struct ClassName {
    class: String,
}

/// Text properties fed to the vectorizer. Metadata is stored, not embedded.
fn vectorized_text_fields(descriptor: &CollectionDescriptor) -> Vec<&str> {
    descriptor
        .fields_of_kind(PropertyKind::Text)
        .into_iter()
        .filter(|name| *name != METADATA_PROPERTY)
        .collect()
}

/// The class definition posted to `/v1/schema`.
fn class_definition(descriptor: &CollectionDescriptor) -> Value {
    let properties: Vec<Value> = descriptor
        .properties
        .iter()
        .map(|p| {
            let data_type = match p.kind {
                PropertyKind::Text => "text",
                PropertyKind::Blob => "blob",
            };
            let mut property = json!({ "name": p.name, "dataType": [data_type] });
            if let Some(description) = &p.description {
                property["description"] = json!(description);
            }
            property
        })
        .collect();

    let (vectorizer, module_config) = match &descriptor.embedding {
        EmbeddingStrategy::DefaultService => (
            MULTIMODAL_MODULE,
            json!({
                "imageFields": descriptor.fields_of_kind(PropertyKind::Blob),
                "textFields": vectorized_text_fields(descriptor),
            }),
        ),
        EmbeddingStrategy::SelfHostedUrl { inference_url } => (
            MULTIMODAL_MODULE,
            json!({
                "imageFields": descriptor.fields_of_kind(PropertyKind::Blob),
                "textFields": vectorized_text_fields(descriptor),
                "inferenceUrl": inference_url,
            }),
        ),
        EmbeddingStrategy::ExternalApi { provider, model } => {
            (provider.module(), json!({ "model": model }))
        },
    };

    let mut class = json!({
        "class": class_name(&descriptor.name),
        "vectorizer": vectorizer,
        "moduleConfig": { vectorizer: module_config },
        "properties": properties,
    });
    if let Some(description) = &descriptor.description {
        class["description"] = json!(description);
    }
    class
}

/// Weaviate stores class names with an upper-case first letter and resolves
/// GraphQL fields by that exact name.
fn class_name(collection: &str) -> String {
    let mut chars = collection.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// GraphQL string literal for `value`.
fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".into())
}

fn near_clause(query: &NearQuery) -> String {
    match query {
        NearQuery::Text(text) => format!("nearText: {{concepts: [{}]}}", quote(text)),
        NearQuery::Image(image) => format!("nearImage: {{image: {}}}", quote(image)),
    }
}

/// Properties of one GraphQL hit, keeping only standard string fields.
fn hit_properties(hit: &Value, return_properties: &[String]) -> ObjectProperties {
    let field = |name: &str| {
        return_properties
            .iter()
            .any(|p| p == name)
            .then(|| hit.get(name)?.as_str().map(str::to_string))
            .flatten()
    };
    ObjectProperties {
        text: field(STANDARD_PROPERTIES[0]),
        image: field(STANDARD_PROPERTIES[1]),
        metadata: field(STANDARD_PROPERTIES[2]),
    }
}

fn parse_hit(hit: &Value, return_properties: &[String]) -> Result<SearchResult> {
    let additional = hit.get("_additional");
    let id = additional
        .and_then(|a| a.get("id")?.as_str())
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| Error::upstream(SERVICE, "search hit without a valid id"))?;
    let distance = additional
        .and_then(|a| a.get("distance")?.as_f64())
        .map(|d| d as f32);
    Ok(SearchResult {
        id,
        distance,
        properties: hit_properties(hit, return_properties),
    })
}

#[async_trait]
impl VectorStore for WeaviateStore {
    fn name(&self) -> &str {
        "weaviate"
    }

    async fn collection_properties(&self, collection: &str) -> Result<Option<Vec<String>>> {
        let response = self
            .send(
                Method::GET,
                &format!("/v1/schema/{}", class_name(collection)),
                None,
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let schema: ClassSchema = check(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("malformed schema: {e}")))?;
        Ok(Some(schema.properties.into_iter().map(|p| p.name).collect()))
    }

    async fn create_collection(&self, descriptor: &CollectionDescriptor) -> Result<()> {
        if let Some(provider) = descriptor.embedding.external_provider()
            && !self.module_keys.contains_key(&provider)
        {
            return Err(Error::auth(
                provider.name(),
                format!(
                    "collection '{}' needs {} to be set",
                    descriptor.name,
                    provider.env_var()
                ),
            ));
        }
        let body = class_definition(descriptor);
        let response = self.send(Method::POST, "/v1/schema", Some(&body)).await?;
        check(response).await?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self.send(Method::GET, "/v1/schema", None).await?;
        let schema: SchemaList = check(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("malformed schema: {e}")))?;
        Ok(schema.classes.into_iter().map(|c| c.class).collect())
    }

    async fn insert_objects(
        &self,
        collection: &str,
        objects: &[ObjectProperties],
    ) -> Result<BatchOutcome> {
        let class = class_name(collection);
        let body = json!({
            "objects": objects
                .iter()
                .map(|o| json!({ "class": class, "properties": o }))
                .collect::<Vec<_>>(),
        });
        let response = self
            .send(Method::POST, "/v1/batch/objects", Some(&body))
            .await?;
        let results: Vec<Value> = check(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("malformed batch response: {e}")))?;

        let failures = results
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let errors = item.pointer("/result/errors/error")?.as_array()?;
                let messages: Vec<&str> = errors
                    .iter()
                    .filter_map(|e| e.get("message")?.as_str())
                    .collect();
                (!messages.is_empty()).then(|| (index, messages.join("; ")))
            })
            .collect();
        Ok(BatchOutcome { failures })
    }

    async fn near(
        &self,
        collection: &str,
        query: &NearQuery,
        limit: usize,
        return_properties: &[String],
    ) -> Result<Vec<SearchResult>> {
        let class = class_name(collection);
        let fields = return_properties.join(" ");
        let graphql = format!(
            "{{ Get {{ {class}({}, limit: {limit}) {{ {fields} _additional {{ id distance }} }} }} }}",
            near_clause(query)
        );
        let data = self.graphql(graphql).await?;
        match data.pointer(&format!("/Get/{class}")) {
            Some(Value::Array(hits)) => hits
                .iter()
                .map(|hit| parse_hit(hit, return_properties))
                .collect(),
            Some(Value::Null) => Ok(Vec::new()),
            _ => Err(Error::upstream(
                SERVICE,
                format!("graphql response without Get.{class}"),
            )),
        }
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        if self.collection_properties(collection).await?.is_none() {
            return Err(Error::collection_not_found(collection));
        }
        let class = class_name(collection);
        let data = self
            .graphql(format!("{{ Aggregate {{ {class} {{ meta {{ count }} }} }} }}"))
            .await?;
        data.pointer(&format!("/Aggregate/{class}/0/meta/count"))
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                Error::upstream(
                    SERVICE,
                    format!("graphql response without Aggregate.{class} meta.count"),
                )
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        axum::{
            Json, Router,
            extract::Path,
            http::{HeaderMap, StatusCode as AxumStatus},
            routing::{get, post},
        },
        std::sync::{Arc, Mutex},
    };

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn store(base: &str) -> WeaviateStore {
        WeaviateStore::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn clip_class_definition() {
        let d = CollectionDescriptor::new("Clip", EmbeddingStrategy::DefaultService)
            .with_description("clip collection");
        let class = class_definition(&d);
        assert_eq!(class["class"], "Clip");
        assert_eq!(class["vectorizer"], "multi2vec-clip");
        assert_eq!(class["description"], "clip collection");
        let module = &class["moduleConfig"]["multi2vec-clip"];
        assert_eq!(module["imageFields"], json!(["image"]));
        assert_eq!(module["textFields"], json!(["text"]));
        assert!(module.get("inferenceUrl").is_none());
        assert_eq!(class["properties"][1]["dataType"], json!(["blob"]));
    }

    #[test]
    fn self_hosted_and_external_definitions() {
        let qwen = class_definition(&CollectionDescriptor::new(
            "Qwen",
            EmbeddingStrategy::SelfHostedUrl {
                inference_url: "http://qwen:8080".into(),
            },
        ));
        assert_eq!(
            qwen["moduleConfig"]["multi2vec-clip"]["inferenceUrl"],
            "http://qwen:8080"
        );

        let cohere = class_definition(&CollectionDescriptor::new(
            "Cohere",
            EmbeddingStrategy::ExternalApi {
                provider: ExternalProvider::Cohere,
                model: "embed-v4.0".into(),
            },
        ));
        assert_eq!(cohere["vectorizer"], "text2vec-cohere");
        assert_eq!(cohere["moduleConfig"]["text2vec-cohere"]["model"], "embed-v4.0");
    }

    #[test]
    fn query_text_is_escaped() {
        let clause = near_clause(&NearQuery::Text("say \"hi\"\n".into()));
        assert_eq!(clause, r#"nearText: {concepts: ["say \"hi\"\n"]}"#);
    }

    #[test]
    fn weaviate_error_bodies_are_unwrapped() {
        let body = r#"{"error":[{"message":"class name Foo already exists"}]}"#;
        assert_eq!(
            error_messages(body).as_deref(),
            Some("class name Foo already exists")
        );
        assert!(error_messages("plain text").is_none());
    }

    #[tokio::test]
    async fn missing_class_is_none_and_existing_lists_properties() {
        let app = Router::new().route(
            "/v1/schema/{name}",
            get(|Path(name): Path<String>| async move {
                if name == "Demo" {
                    (
                        AxumStatus::OK,
                        Json(json!({"class": "Demo", "properties": [{"name": "text"}, {"name": "image"}]})),
                    )
                } else {
                    (AxumStatus::NOT_FOUND, Json(json!({})))
                }
            }),
        );
        let base = serve(app).await;
        let store = store(&base);
        assert_eq!(
            store.collection_properties("Demo").await.unwrap(),
            Some(vec!["text".to_string(), "image".to_string()])
        );
        assert!(store.collection_properties("Other").await.unwrap().is_none());
        assert!(!store.collection_exists("Other").await.unwrap());
    }

    #[tokio::test]
    async fn create_forwards_provider_key_header() {
        let seen = Arc::new(Mutex::new(None::<(Option<String>, Value)>));
        let captured = Arc::clone(&seen);
        let app = Router::new().route(
            "/v1/schema",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let captured = Arc::clone(&captured);
                async move {
                    let key = headers
                        .get("X-Cohere-Api-Key")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    *captured.lock().unwrap() = Some((key, body.clone()));
                    Json(body)
                }
            }),
        );
        let base = serve(app).await;
        let cohere = CollectionDescriptor::new("Cohere", EmbeddingStrategy::ExternalApi {
            provider: ExternalProvider::Cohere,
            model: "embed-v4.0".into(),
        });

        let err = store(&base).create_collection(&cohere).await.unwrap_err();
        assert!(matches!(err, Error::Auth { .. }));
        assert!(seen.lock().unwrap().is_none(), "no request without a key");

        store(&base)
            .with_provider_key(ExternalProvider::Cohere, Secret::new("co-key".into()))
            .create_collection(&cohere)
            .await
            .unwrap();
        let (key, body) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(key.as_deref(), Some("co-key"));
        assert_eq!(body["class"], "Cohere");
    }

    #[tokio::test]
    async fn batch_failures_are_reported_by_position() {
        let app = Router::new().route(
            "/v1/batch/objects",
            post(|Json(body): Json<Value>| async move {
                let results: Vec<Value> = body["objects"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .enumerate()
                    .map(|(i, _)| {
                        if i == 1 {
                            json!({"result": {"errors": {"error": [{"message": "vectorizer failed"}]}}})
                        } else {
                            json!({"result": {}})
                        }
                    })
                    .collect();
                Json(Value::Array(results))
            }),
        );
        let base = serve(app).await;
        let objects = vec![
            ObjectProperties {
                text: Some("a".into()),
                ..Default::default()
            };
            3
        ];
        let outcome = store(&base).insert_objects("Demo", &objects).await.unwrap();
        assert_eq!(outcome.failures, vec![(1, "vectorizer failed".to_string())]);
        assert_eq!(outcome.accepted(3), 2);
    }

    #[tokio::test]
    async fn near_parses_hits_in_order() {
        let seen = Arc::new(Mutex::new(String::new()));
        let captured = Arc::clone(&seen);
        let app = Router::new().route(
            "/v1/graphql",
            post(move |Json(body): Json<Value>| {
                let captured = Arc::clone(&captured);
                async move {
                    *captured.lock().unwrap() = body["query"].as_str().unwrap_or_default().to_string();
                    Json(json!({"data": {"Get": {"Demo": [
                        {"text": "sunset", "_additional": {"id": "6a0f1f5e-0c1d-4b7e-9d55-3a8f0c1e2b3c", "distance": 0.12}},
                        {"text": "city", "_additional": {"id": "1b2c3d4e-5f60-4172-8394-a5b6c7d8e9f0", "distance": 0.5}}
                    ]}}}))
                }
            }),
        );
        let base = serve(app).await;
        let hits = store(&base)
            .near("Demo", &NearQuery::Text("sunset".into()), 2, &["text".into()])
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].properties.text.as_deref(), Some("sunset"));
        assert!((hits[0].distance.unwrap() - 0.12).abs() < 1e-6);
        let query = seen.lock().unwrap().clone();
        assert!(query.contains("Demo(nearText: {concepts: [\"sunset\"]}, limit: 2)"), "{query}");
        assert!(query.contains("_additional { id distance }"));
    }

    #[tokio::test]
    async fn graphql_errors_are_upstream() {
        let app = Router::new().route(
            "/v1/graphql",
            post(|| async { Json(json!({"errors": [{"message": "no module with name multi2vec-clip"}]})) }),
        );
        let base = serve(app).await;
        let err = store(&base)
            .near("Demo", &NearQuery::Text("x".into()), 1, &["text".into()])
            .await
            .unwrap_err();
        match err {
            Error::Upstream { reason, .. } => assert!(reason.contains("multi2vec-clip")),
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth() {
        let app = Router::new().route(
            "/v1/schema",
            get(|| async {
                (
                    AxumStatus::UNAUTHORIZED,
                    Json(json!({"error": [{"message": "anonymous access not enabled"}]})),
                )
            }),
        );
        let base = serve(app).await;
        let err = store(&base).list_collections().await.unwrap_err();
        assert!(matches!(err, Error::Auth { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_store_is_upstream() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = store(&format!("http://{addr}")).ready().await.unwrap_err();
        assert!(matches!(err, Error::Upstream { service: "vector store", .. }));
        assert!(err.hint().is_some_and(|h| h.contains("store.url")));
    }

    #[test]
    fn class_names_are_capitalized() {
        assert_eq!(class_name("demo"), "Demo");
        assert_eq!(class_name("Demo"), "Demo");
        assert_eq!(class_name("multimodal_clip"), "Multimodal_clip");
        assert_eq!(class_name(""), "");
        let class = class_definition(&CollectionDescriptor::new(
            "demo",
            EmbeddingStrategy::DefaultService,
        ));
        assert_eq!(class["class"], "Demo");
    }

    #[tokio::test]
    async fn lowercase_collection_queries_the_stored_class() {
        let app = Router::new().route(
            "/v1/graphql",
            post(|Json(body): Json<Value>| async move {
                let query = body["query"].as_str().unwrap_or_default();
                if query.contains("Get { Demo(") {
                    Json(json!({"data": {"Get": {"Demo": [
                        {"text": "sunset", "_additional": {"id": "6a0f1f5e-0c1d-4b7e-9d55-3a8f0c1e2b3c", "distance": 0.1}}
                    ]}}}))
                } else {
                    Json(json!({"errors": [{"message": "Cannot query field"}]}))
                }
            }),
        );
        let base = serve(app).await;
        let hits = store(&base)
            .near("demo", &NearQuery::Text("sunset".into()), 1, &["text".into()])
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn near_without_collection_key_is_upstream() {
        let app = Router::new().route(
            "/v1/graphql",
            post(|| async { Json(json!({"data": {"Get": {}}})) }),
        );
        let base = serve(app).await;
        let err = store(&base)
            .near("Demo", &NearQuery::Text("x".into()), 1, &["text".into()])
            .await
            .unwrap_err();
        match err {
            Error::Upstream { reason, .. } => assert!(reason.contains("Get.Demo"), "{reason}"),
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn null_hits_are_an_empty_result() {
        let app = Router::new().route(
            "/v1/graphql",
            post(|| async { Json(json!({"data": {"Get": {"Demo": null}}})) }),
        );
        let base = serve(app).await;
        let hits = store(&base)
            .near("Demo", &NearQuery::Text("x".into()), 1, &["text".into()])
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn count_without_meta_is_upstream() {
        let app = Router::new()
            .route(
                "/v1/schema/{name}",
                get(|| async { Json(json!({"class": "Demo", "properties": [{"name": "text"}]})) }),
            )
            .route(
                "/v1/graphql",
                post(|| async { Json(json!({"data": {"Aggregate": {}}})) }),
            );
        let base = serve(app).await;
        let err = store(&base).count("Demo").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn count_reads_aggregate_meta() {
        let app = Router::new()
            .route(
                "/v1/schema/{name}",
                get(|| async { Json(json!({"class": "Demo", "properties": [{"name": "text"}]})) }),
            )
            .route(
                "/v1/graphql",
                post(|| async { Json(json!({"data": {"Aggregate": {"Demo": [{"meta": {"count": 42}}]}}})) }),
            );
        let base = serve(app).await;
        assert_eq!(store(&base).count("Demo").await.unwrap(), 42);
    }
}
