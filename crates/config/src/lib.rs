//! Configuration: file discovery, format parsing, environment overrides.

pub mod loader;
pub mod schema;

pub use {
    loader::{
        ConfigError, ConfigFormat, apply_env_overrides, discover_and_load, load_from_path,
        parse_config, validate,
    },
    schema::{
        EmbeddingConfig, GenerationConfig, ImportConfig, MmragConfig, SearchConfig, StoreConfig,
        default_collections,
    },
};
