//! Import records and the bundled sample dataset.

use std::path::{Path, PathBuf};

use {
    mmrag_common::{Error, Result},
    serde::{Deserialize, Serialize},
    serde_json::json,
};

/// One item to import: free text, an optional image on disk and optional
/// structured metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<M = serde_json::Value> {
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "image_path", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<M>,
}

impl<M> Record<M> {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_ref: None,
            metadata: None,
        }
    }

    pub fn with_image(mut self, path: impl AsRef<Path>) -> Self {
        self.image_ref = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_metadata(mut self, metadata: M) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Image path, treating an empty path as no image.
    pub fn image_path(&self) -> Option<&Path> {
        self.image_ref
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// The five demo items: nature, urban, animals, nature, food.
pub fn sample_records() -> Vec<Record> {
    vec![
        Record::new("A beautiful sunset over the ocean with orange and pink colors")
            .with_metadata(json!({"category": "nature", "tags": ["sunset", "ocean", "colors"]})),
        Record::new("A modern city skyline at night with illuminated skyscrapers")
            .with_metadata(json!({"category": "urban", "tags": ["city", "night", "architecture"]})),
        Record::new("A cute cat playing with a ball of yarn")
            .with_metadata(json!({"category": "animals", "tags": ["cat", "pet", "playful"]})),
        Record::new("Mountain landscape with snow-capped peaks and a clear blue sky")
            .with_metadata(json!({"category": "nature", "tags": ["mountains", "snow", "landscape"]})),
        Record::new("Delicious sushi platter with fresh salmon and tuna")
            .with_metadata(json!({"category": "food", "tags": ["sushi", "japanese", "seafood"]})),
    ]
}

/// Load records from a JSON array, or from JSON Lines when the extension is
/// `.jsonl`. Relative image paths resolve against the file's directory.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::file_not_found(path)
        } else {
            Error::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let is_jsonl = path.extension().and_then(|e| e.to_str()) == Some("jsonl");
    let mut records: Vec<Record> = if is_jsonl {
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    Error::Serialization(format!("{} line {}: {e}", path.display(), i + 1))
                })
            })
            .collect::<Result<_>>()?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| Error::Serialization(format!("{}: {e}", path.display())))?
    };

    if let Some(base) = path.parent() {
        for record in &mut records {
            if let Some(image) = &record.image_ref
                && image.is_relative()
                && !image.as_os_str().is_empty()
            {
                record.image_ref = Some(base.join(image));
            }
        }
    }
    Ok(records)
}
