//! Generator configuration (`bhapi.toml`)
//!
//! ```toml
//! [paths]
//! src_root = ".."
//! provider_source = "bridge/py_api/src/_bh_api.c"
//! type_definitions = "build/bridge/c/out/bhc_types.h"
//! opcodes = "core/codegen/opcodes.json"
//! types = "core/codegen/types.json"
//! out_dir = "build/py_api"
//!
//! [api]
//! prefix = "BhAPI"
//! capsule_key = "bohrium_api._C_API"
//!
//! [metadata]
//! format = "python"
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use crate::build::version::DEFAULT_GIT_TIMEOUT;
use crate::codegen::InfoFormat;
use crate::ir::ApiNames;
use crate::metadata::DEFAULT_OPCODE_PREFIX;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "bhapi.toml";

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config {path}: {source}", path = .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema
    #[error("failed to parse config {path}: {source}", path = .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level generator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Input and output locations
    pub paths: PathsConfig,
    /// Header naming
    pub api: ApiNames,
    /// Info artifact settings
    pub metadata: MetadataConfig,
}

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the source tree; git runs here
    pub src_root: PathBuf,
    /// Provider C source holding the exported functions
    pub provider_source: Option<PathBuf>,
    /// Type definitions inlined into the header
    pub type_definitions: Option<PathBuf>,
    /// Declarative opcode table (JSON)
    pub opcodes: Option<PathBuf>,
    /// Declarative element-type table (JSON)
    pub types: Option<PathBuf>,
    /// Fallback version file, `<src_root>/VERSION` when unset
    pub version_file: Option<PathBuf>,
    /// Directory receiving the generated artifacts
    pub out_dir: PathBuf,
    /// File name of the generated header
    pub header_name: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src_root: PathBuf::from("."),
            provider_source: None,
            type_definitions: None,
            opcodes: None,
            types: None,
            version_file: None,
            out_dir: PathBuf::from("out"),
            header_name: "bohrium_api.h".to_string(),
        }
    }
}

/// Info artifact settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Prefix stripped from internal opcode identifiers
    pub opcode_prefix: String,
    /// Output format
    pub format: InfoFormat,
    /// Bound on the git describe invocation, in seconds
    pub git_timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            opcode_prefix: DEFAULT_OPCODE_PREFIX.to_string(),
            format: InfoFormat::default(),
            git_timeout_secs: DEFAULT_GIT_TIMEOUT.as_secs(),
        }
    }
}

impl GeneratorConfig {
    /// Parse a configuration from TOML text without resolving paths
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load a configuration file and resolve its relative paths
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.paths.resolve_relative(base);
        Ok(config)
    }
}

impl PathsConfig {
    /// Make every relative path relative to `base`
    pub fn resolve_relative(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        join(&mut self.src_root);
        join(&mut self.out_dir);
        for p in [
            &mut self.provider_source,
            &mut self.type_definitions,
            &mut self.opcodes,
            &mut self.types,
            &mut self.version_file,
        ]
        .into_iter()
        .flatten()
        {
            join(p);
        }
    }
}
