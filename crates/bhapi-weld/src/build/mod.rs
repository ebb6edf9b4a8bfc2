//! Build utilities for the C API generator
//!
//! This module provides:
//! - `ApiBuilder`, running the whole pipeline from build.rs or the CLI
//! - `GeneratorConfig`, the `bhapi.toml` schema
//! - `VersionResolver`, git describe with a version-file fallback

pub mod api;
pub mod config;
pub mod version;

pub use api::{ApiBuilder, ApiBuilderError, BuildOutput};
pub use config::{ConfigError, GeneratorConfig, MetadataConfig, PathsConfig, CONFIG_FILE_NAME};
pub use version::{parse_describe, VersionError, VersionResolver, VersionSource};
