//! Collection schema types shared between configuration and the store layer.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Property holding the caption / free text of an object.
pub const TEXT_PROPERTY: &str = "text";
/// Property holding the base64-encoded image of an object.
pub const IMAGE_PROPERTY: &str = "image";
/// Property holding serialized JSON metadata.
pub const METADATA_PROPERTY: &str = "metadata";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Text,
    /// Binary payload carried as base64 text.
    Blob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The `text` / `image` / `metadata` property set used by every collection.
pub fn standard_properties() -> Vec<PropertyDef> {
    vec![
        PropertyDef::new(TEXT_PROPERTY, PropertyKind::Text).with_description("Text data"),
        PropertyDef::new(IMAGE_PROPERTY, PropertyKind::Blob)
            .with_description("Image data (base64 encoded)"),
        PropertyDef::new(METADATA_PROPERTY, PropertyKind::Text)
            .with_description("Additional metadata (JSON string)"),
    ]
}

/// Third-party embedding APIs a collection can delegate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalProvider {
    Cohere,
}

impl ExternalProvider {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cohere => "cohere",
        }
    }

    /// Vectorizer module the store uses for this provider.
    pub fn module(self) -> &'static str {
        match self {
            Self::Cohere => "text2vec-cohere",
        }
    }

    /// Request header that forwards the API key to the store.
    pub fn key_header(self) -> &'static str {
        match self {
            Self::Cohere => "X-Cohere-Api-Key",
        }
    }

    /// Environment variable the key is read from.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::Cohere => "COHERE_APIKEY",
        }
    }
}

/// How a collection turns text and images into vectors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EmbeddingStrategy {
    /// The store's built-in multimodal pipeline on its default endpoint.
    #[default]
    DefaultService,
    /// Same pipeline, pointed at a caller-supplied inference service.
    SelfHostedUrl { inference_url: String },
    /// A third-party embedding API keyed by model id.
    ExternalApi {
        provider: ExternalProvider,
        model: String,
    },
}

impl EmbeddingStrategy {
    pub fn external_provider(&self) -> Option<ExternalProvider> {
        match self {
            Self::ExternalApi { provider, .. } => Some(*provider),
            Self::DefaultService | Self::SelfHostedUrl { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "standard_properties")]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub embedding: EmbeddingStrategy,
}

impl CollectionDescriptor {
    /// Descriptor with the standard property set.
    pub fn new(name: impl Into<String>, embedding: EmbeddingStrategy) -> Self {
        Self {
            name: name.into(),
            description: None,
            properties: standard_properties(),
            embedding,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_properties(mut self, properties: Vec<PropertyDef>) -> Self {
        self.properties = properties;
        self
    }

    pub fn declares(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p.name == property)
    }

    /// Names of the declared properties of `kind`, in declaration order.
    pub fn fields_of_kind(&self, kind: PropertyKind) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn property_names(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.name.clone()).collect()
    }

    /// Reject names the store cannot hold and duplicate property names.
    pub fn validate(&self) -> Result<()> {
        let mut chars = self.name.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        if !starts_with_letter || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::InvalidInput(format!(
                "collection name '{}' must start with a letter and contain only letters, digits and '_'",
                self.name
            )));
        }
        if self.properties.is_empty() {
            return Err(Error::InvalidInput(format!(
                "collection '{}' declares no properties",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for property in &self.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "collection '{}' declares property '{}' twice",
                    self.name, property.name
                )));
            }
        }
        if let EmbeddingStrategy::SelfHostedUrl { inference_url } = &self.embedding
            && inference_url.trim().is_empty()
        {
            return Err(Error::InvalidInput(format!(
                "collection '{}' uses a self-hosted embedding service without an inference_url",
                self.name
            )));
        }
        Ok(())
    }
}
