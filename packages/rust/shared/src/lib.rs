//! Shared types, error model, and configuration for docmigrate.
//!
//! This crate is the foundation depended on by all other docmigrate crates.
//! It provides:
//! - [`DocMigrateError`], the unified error type
//! - Domain types ([`SourceDocument`], [`NavigationEntry`], [`DirectoryManifest`])
//! - Configuration ([`AppConfig`], [`MigrateConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, ConverterConfig, MigrateConfig, PathsConfig, SiteConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DocMigrateError, Result};
pub use types::{
    ConversionFailure, ConversionResult, DirectoryManifest, MANIFEST_FILE_NAME, NavigationEntry,
    PAGE_EXTENSION, SOURCE_EXTENSION, SourceDocument,
};
