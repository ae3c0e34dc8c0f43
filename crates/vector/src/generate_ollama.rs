/// Ollama generation provider using the `/api/generate` endpoint.
use std::time::Duration;

use {
    async_trait::async_trait,
    mmrag_common::{Error, Result},
    mmrag_config::GenerationConfig,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

#[cfg(feature = "metrics")]
use mmrag_metrics::{counter, generation as gen_metrics, histogram, labels};

use crate::generate::{GenerationProvider, GenerationRequest};

const SERVICE: &str = "generation";

pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn generate_endpoint(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url);
    if normalized.ends_with("/api/generate") {
        return normalized;
    }
    if normalized.ends_with("/api") {
        return format!("{normalized}/generate");
    }
    format!("{normalized}/api/generate")
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::upstream(SERVICE, e))?;
        Ok(Self {
            client,
            endpoint: generate_endpoint(base_url),
            model: model.into(),
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::new(&config.endpoint, config.model.clone(), config.timeout())
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    images: &'a [String],
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>> {
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            images: &request.images,
        };
        debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            prompt_len = request.prompt.len(),
            images = request.images.len(),
            "sending generation request"
        );

        let result = self.send(&body).await;

        #[cfg(feature = "metrics")]
        {
            let outcome = if result.is_ok() { "ok" } else { "error" };
            counter!(gen_metrics::REQUESTS_TOTAL, labels::MODEL => self.model.clone(), labels::OUTCOME => outcome)
                .increment(1);
            histogram!(gen_metrics::DURATION_SECONDS, labels::MODEL => self.model.clone())
                .record(start.elapsed().as_secs_f64());
        }

        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl OllamaGenerator {
    async fn send(&self, body: &GenerateRequest<'_>) -> Result<Option<String>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<GenerateResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(text);
            return Err(Error::upstream(
                SERVICE,
                format!("{status} from {}: {detail}", self.endpoint),
            ));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("malformed response: {e}")))?;
        if let Some(error) = parsed.error {
            return Err(Error::upstream(SERVICE, error));
        }
        Ok(parsed.response.filter(|r| !r.trim().is_empty()))
    }
}
