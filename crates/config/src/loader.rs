//! Locate, parse and validate the configuration file.
//!
//! Lookup order: explicit path, `$MMRAG_CONFIG`, `./mmrag.{toml,yaml,yml,json}`,
//! then the same names in the platform config directory. No file at all is
//! fine: defaults apply. Environment overrides are layered on top.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use {
    directories::ProjectDirs,
    mmrag_common::types::ExternalProvider,
    tracing::{debug, info},
};

use crate::schema::MmragConfig;

pub const CONFIG_ENV: &str = "MMRAG_CONFIG";
pub const STORE_URL_ENV: &str = "MMRAG_STORE_URL";
pub const STORE_API_KEY_ENV: &str = "MMRAG_STORE_API_KEY";
pub const GENERATION_ENDPOINT_ENV: &str = "MMRAG_GENERATION_ENDPOINT";
pub const GENERATION_MODEL_ENV: &str = "MMRAG_GENERATION_MODEL";

const FILE_STEM: &str = "mmrag";
const EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {format} config: {reason}")]
    Parse {
        format: &'static str,
        reason: String,
    },

    #[error("unsupported config format for '{}' (expected .toml, .yaml, .yml or .json)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        }
    }
}

/// Load the effective configuration: file (if any) + process environment.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<MmragConfig, ConfigError> {
    let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let path = find_config_file(explicit.or(env_path.as_deref()), &search_dirs())?;

    let mut config = match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_from_path(&path)?
        },
        None => {
            debug!("no config file found, using defaults");
            MmragConfig::default()
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(project) = ProjectDirs::from("org", "mmrag", FILE_STEM) {
        dirs.push(project.config_dir().to_path_buf());
    }
    dirs
}

/// Resolve the config file to load. An explicit path must exist; otherwise
/// the first `mmrag.<ext>` found in `dirs` wins.
pub fn find_config_file(
    explicit: Option<&Path>,
    dirs: &[PathBuf],
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        return Ok(Some(path.to_path_buf()));
    }

    for dir in dirs {
        for ext in EXTENSIONS {
            let candidate = dir.join(format!("{FILE_STEM}.{ext}"));
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }
    }
    Ok(None)
}

pub fn load_from_path(path: &Path) -> Result<MmragConfig, ConfigError> {
    let format =
        ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat(path.into()))?;
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents, format)
}

pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<MmragConfig, ConfigError> {
    let parse_err = |reason: String| ConfigError::Parse {
        format: format.name(),
        reason,
    };
    match format {
        ConfigFormat::Toml => toml::from_str(contents).map_err(|e| parse_err(e.to_string())),
        ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| parse_err(e.to_string())),
        ConfigFormat::Json => serde_json::from_str(contents).map_err(|e| parse_err(e.to_string())),
    }
}

/// Layer environment variables over the file values. `lookup` abstracts the
/// environment so callers (and tests) can supply their own source.
pub fn apply_env_overrides(config: &mut MmragConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(STORE_URL_ENV) {
        config.store.url = url;
    }
    if let Some(key) = non_empty(STORE_API_KEY_ENV) {
        config.store.api_key = Some(key);
    }
    if let Some(endpoint) = non_empty(GENERATION_ENDPOINT_ENV) {
        config.generation.endpoint = endpoint;
    }
    if let Some(model) = non_empty(GENERATION_MODEL_ENV) {
        config.generation.model = model;
    }
    if config.embedding.cohere_api_key.is_none()
        && let Some(key) = non_empty(ExternalProvider::Cohere.env_var())
    {
        config.embedding.cohere_api_key = Some(key);
    }
}

pub fn validate(config: &MmragConfig) -> Result<(), ConfigError> {
    for (name, url) in [
        ("store.url", &config.store.url),
        ("generation.endpoint", &config.generation.endpoint),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "{name} must be an http(s) URL, got '{url}'"
            )));
        }
    }
    if config.store.timeout_secs == 0 || config.generation.timeout_secs == 0 {
        return Err(ConfigError::Invalid("timeouts must be at least 1 second".into()));
    }
    if config.import.batch_size == 0 {
        return Err(ConfigError::Invalid("import.batch_size must be at least 1".into()));
    }
    if config.generation.model.trim().is_empty() {
        return Err(ConfigError::Invalid("generation.model must not be empty".into()));
    }

    let mut names = HashSet::new();
    for collection in &config.collections {
        collection
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if !names.insert(collection.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "collection '{}' is configured twice",
                collection.name
            )));
        }
    }
    if config.default_collection.trim().is_empty() {
        return Err(ConfigError::Invalid("default_collection must not be empty".into()));
    }
    Ok(())
}
