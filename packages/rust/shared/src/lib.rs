//! Shared types, error model, and configuration for Placebook.
//!
//! This crate is the foundation depended on by all other Placebook crates.
//! It provides:
//! - [`PlacebookError`] — the unified error type
//! - Domain types ([`Place`], [`Catalog`], [`EnrichmentStatus`], …)
//! - Configuration ([`AppConfig`], config loading, secret resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ModelConfig, PlacesConfig, SecretSource, SourceConfig,
    StorageConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_secret,
};
pub use error::{PlacebookError, Result};
pub use types::{
    Catalog, CatalogMetadata, Coordinates, EnrichmentStats, EnrichmentStatus, Hours, PARSER_VERSION,
    Place, PlaceType, PriceRange, SourceConfidence, Weekday,
};
