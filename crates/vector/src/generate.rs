/// Text generation abstraction used by the RAG orchestrator.
use async_trait::async_trait;
use mmrag_common::Result;

/// One generation call: a prompt plus optional base64 images for
/// vision-capable models.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub images: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generated text, or `None` when the model returned nothing.
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>>;

    fn model_name(&self) -> &str;

    /// Where requests are sent, for logs and error messages.
    fn endpoint(&self) -> &str;
}
