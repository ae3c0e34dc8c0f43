//! Retrieval-augmented answers: search a collection, then ask the generator
//! with the hits as context.

use {
    mmrag_common::{Error, Result},
    tracing::{debug, info},
};

use crate::{
    generate::{GenerationProvider, GenerationRequest},
    search::{SearchQuery, SearchResult, search},
    store::VectorStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOptions {
    /// How many hits to use as context.
    pub limit: usize,
    /// Forward retrieved images to the generator.
    pub attach_images: bool,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            limit: 3,
            attach_images: false,
        }
    }
}

/// Answer `question` grounded in the results of `query` against `collection`.
///
/// Returns `Ok(None)` without calling the generator when nothing was
/// retrieved, and when the generator produced no text.
pub async fn answer(
    store: &dyn VectorStore,
    generator: &dyn GenerationProvider,
    collection: &str,
    query: &SearchQuery,
    question: &str,
    limit: usize,
) -> Result<Option<String>> {
    answer_with_options(store, generator, collection, query, question, AnswerOptions {
        limit,
        ..Default::default()
    })
    .await
}

pub async fn answer_with_options(
    store: &dyn VectorStore,
    generator: &dyn GenerationProvider,
    collection: &str,
    query: &SearchQuery,
    question: &str,
    options: AnswerOptions,
) -> Result<Option<String>> {
    if question.trim().is_empty() {
        return Err(Error::InvalidInput("question must not be empty".into()));
    }

    let context = search(store, collection, query, options.limit, None).await?;
    if context.is_empty() {
        info!(collection, "no context retrieved, skipping generation");
        return Ok(None);
    }

    let mut request = GenerationRequest::new(build_prompt(question, &context));
    if options.attach_images {
        request.images = context
            .iter()
            .filter_map(|r| r.properties.image.clone())
            .collect();
    }
    debug!(
        collection,
        context = context.len(),
        images = request.images.len(),
        model = generator.model_name(),
        "generating answer"
    );

    let answer = generator.generate(&request).await?;
    info!(
        collection,
        model = generator.model_name(),
        answered = answer.is_some(),
        "rag complete"
    );
    Ok(answer)
}

/// The question followed by the numbered context items, closest first.
pub fn build_prompt(question: &str, context: &[SearchResult]) -> String {
    let mut prompt = String::from(
        "Answer the question using only the context below. \
         If the context is not sufficient, say so.\n\n",
    );
    prompt.push_str(&format!("Question: {question}\n\nContext:\n"));
    for (i, hit) in context.iter().enumerate() {
        prompt.push_str(&format!("{}.", i + 1));
        if let Some(text) = &hit.properties.text {
            prompt.push_str(&format!(" {text}"));
        }
        if let Some(metadata) = &hit.properties.metadata {
            prompt.push_str(&format!(" (metadata: {metadata})"));
        }
        if hit.properties.image.is_some() {
            prompt.push_str(" [image attached to this item]");
        }
        prompt.push('\n');
    }
    prompt.push_str("\nAnswer:");
    prompt
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{
            import::import_records, record::Record, schema::ensure_collection,
            store_memory::MemoryVectorStore,
        },
        async_trait::async_trait,
        mmrag_common::types::{CollectionDescriptor, EmbeddingStrategy},
        std::sync::Mutex,
    };

    /// Records prompts and answers with a canned reply.
    struct ScriptedGenerator {
        reply: Option<String>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        fn replying(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationProvider for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn endpoint(&self) -> &str {
            "memory://scripted"
        }
    }

    async fn store_with(records: &[Record]) -> MemoryVectorStore {
        let store = MemoryVectorStore::new();
        ensure_collection(
            &store,
            &CollectionDescriptor::new("Demo", EmbeddingStrategy::DefaultService),
        )
        .await
        .unwrap();
        import_records(&store, "Demo", records, 10).await.unwrap();
        store
    }

    #[tokio::test]
    async fn context_reaches_the_prompt() {
        let store = store_with(&[
            Record::new("A beautiful sunset over the ocean")
                .with_metadata(serde_json::json!({"category": "nature"})),
            Record::new("Delicious sushi platter"),
        ])
        .await;
        let generator = ScriptedGenerator::replying(Some("The sky is orange."));

        let answer = answer(
            &store,
            &generator,
            "Demo",
            &SearchQuery::Text("sunset".into()),
            "What colour is the sky?",
            1,
        )
        .await
        .unwrap();
        assert_eq!(answer.as_deref(), Some("The sky is orange."));

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        let prompt = &calls[0].prompt;
        assert!(prompt.contains("What colour is the sky?"));
        assert!(prompt.contains("1. A beautiful sunset over the ocean"));
        assert!(prompt.contains("\"category\":\"nature\""));
        assert!(!prompt.contains("sushi"), "limit 1 keeps only the best hit");
        assert!(calls[0].images.is_empty());
    }

    #[tokio::test]
    async fn empty_collection_skips_generation() {
        let store = store_with(&[]).await;
        let generator = ScriptedGenerator::replying(Some("unused"));
        let answer = answer(
            &store,
            &generator,
            "Demo",
            &SearchQuery::Text("anything".into()),
            "why?",
            3,
        )
        .await
        .unwrap();
        assert!(answer.is_none());
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn generator_returning_nothing_is_none() {
        let store = store_with(&[Record::new("a cat")]).await;
        let generator = ScriptedGenerator::replying(None);
        let answer = answer(
            &store,
            &generator,
            "Demo",
            &SearchQuery::Text("cat".into()),
            "what animal?",
            3,
        )
        .await
        .unwrap();
        assert!(answer.is_none());
        assert_eq!(generator.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_question_is_rejected_before_search() {
        let store = MemoryVectorStore::new();
        let generator = ScriptedGenerator::replying(Some("x"));
        let err = answer(
            &store,
            &generator,
            "Missing",
            &SearchQuery::Text("cat".into()),
            "   ",
            3,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_collection_propagates() {
        let store = MemoryVectorStore::new();
        let generator = ScriptedGenerator::replying(Some("x"));
        let err = answer(
            &store,
            &generator,
            "Missing",
            &SearchQuery::Text("cat".into()),
            "what?",
            3,
        )
        .await
        .unwrap_err();
        assert!(err.is_missing_collection());
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn images_attached_only_on_request() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cat = tmp.path().join("cat.jpg");
        std::fs::write(&cat, b"cat pixels").unwrap();
        let store = store_with(&[Record::new("a cat").with_image(&cat)]).await;
        let generator = ScriptedGenerator::replying(Some("a cat"));

        answer_with_options(
            &store,
            &generator,
            "Demo",
            &SearchQuery::Text("cat".into()),
            "what animal?",
            AnswerOptions {
                limit: 1,
                attach_images: true,
            },
        )
        .await
        .unwrap();
        let calls = generator.calls();
        assert_eq!(calls[0].images.len(), 1);
        assert!(calls[0].prompt.contains("[image attached to this item]"));
    }
}
