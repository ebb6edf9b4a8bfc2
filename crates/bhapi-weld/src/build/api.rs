//! ApiBuilder for build scripts and the CLI
//!
//! This module runs the whole generation pipeline: extract the exported
//! signatures from the provider source, index them, render the header
//! around the type definitions, compile the opcode metadata and write the
//! info artifact next to it.

use crate::build::config::GeneratorConfig;
use crate::build::version::{VersionError, VersionResolver, DEFAULT_GIT_TIMEOUT};
use crate::codegen::{HeaderGenerator, InfoArtifact, InfoFormat, InfoGenerator};
use crate::extract::{extract_signatures, ExtractError};
use crate::ir::{ApiModule, ApiNames, ModuleValidationError};
use crate::metadata::{
    MetadataError, OpcodeCompiler, OpcodeTable, TypeTable, DEFAULT_OPCODE_PREFIX,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during generation
#[derive(Debug, Error)]
pub enum ApiBuilderError {
    /// Environment variable not set
    #[error("Environment variable not set: {0}")]
    EnvVarMissing(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// An input file could not be read
    #[error("failed to read {path}: {source}", path = .path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Provider source path not set
    #[error("Provider source not set")]
    ProviderSourceNotSet,

    /// Type definitions path not set
    #[error("Type definitions not set; the header cannot be generated without them")]
    TypeDefinitionsNotSet,

    /// Type definitions file missing
    #[error("Type definitions not found: {}", .0.display())]
    TypeDefinitionsNotFound(PathBuf),

    /// Opcode or type table path not set
    #[error("Opcode and type tables must both be set to generate the info artifact")]
    MetadataTablesNotSet,

    /// Signature extraction failed
    #[error("{}: {source}", .path.display())]
    ExtractError {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    /// Module validation error
    #[error("Module validation error: {0}")]
    ValidationError(#[from] ModuleValidationError),

    /// Opcode metadata error
    #[error("Metadata error: {0}")]
    MetadataError(#[from] MetadataError),

    /// Version resolution error
    #[error("Version error: {0}")]
    VersionError(#[from] VersionError),

    /// Info rendering error
    #[error("Render error: {0}")]
    RenderError(#[from] serde_json::Error),
}

/// Builder for the generated C API artifacts
///
/// # Example
/// ```ignore
/// use bhapi_weld::build::ApiBuilder;
///
/// fn main() {
///     ApiBuilder::new()
///         .provider_source("src/_bh_api.c")
///         .type_definitions("../c/out/bhc_types.h")
///         .metadata_tables("../../core/codegen/opcodes.json", "../../core/codegen/types.json")
///         .src_root("../..")
///         .build()
///         .expect("Failed to generate the C API");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiBuilder {
    names: ApiNames,
    doc: Option<String>,
    provider_source: Option<PathBuf>,
    type_definitions: Option<PathBuf>,
    opcodes: Option<PathBuf>,
    types: Option<PathBuf>,
    src_root: PathBuf,
    version_file: Option<PathBuf>,
    version: Option<String>,
    git_timeout: Duration,
    opcode_prefix: String,
    info_format: InfoFormat,
    out_dir: Option<PathBuf>,
    header_name: String,
    additional_watch: Vec<PathBuf>,
}

impl Default for ApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiBuilder {
    /// Create a builder with the default names
    pub fn new() -> Self {
        Self {
            names: ApiNames::default(),
            doc: None,
            provider_source: None,
            type_definitions: None,
            opcodes: None,
            types: None,
            src_root: PathBuf::from("."),
            version_file: None,
            version: None,
            git_timeout: DEFAULT_GIT_TIMEOUT,
            opcode_prefix: DEFAULT_OPCODE_PREFIX.to_string(),
            info_format: InfoFormat::default(),
            out_dir: None,
            header_name: "bohrium_api.h".to_string(),
            additional_watch: Vec::new(),
        }
    }

    /// Create a builder from a loaded configuration
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let paths = &config.paths;
        Self {
            names: config.api.clone(),
            provider_source: paths.provider_source.clone(),
            type_definitions: paths.type_definitions.clone(),
            opcodes: paths.opcodes.clone(),
            types: paths.types.clone(),
            src_root: paths.src_root.clone(),
            version_file: paths.version_file.clone(),
            git_timeout: Duration::from_secs(config.metadata.git_timeout_secs),
            opcode_prefix: config.metadata.opcode_prefix.clone(),
            info_format: config.metadata.format,
            out_dir: Some(paths.out_dir.clone()),
            header_name: paths.header_name.clone(),
            ..Self::new()
        }
    }

    /// Set the header naming
    pub fn names(mut self, names: ApiNames) -> Self {
        self.names = names;
        self
    }

    /// Set documentation rendered into the header banner
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Set the provider C source
    pub fn provider_source(mut self, path: impl AsRef<Path>) -> Self {
        self.provider_source = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the type definitions inlined into the header
    pub fn type_definitions(mut self, path: impl AsRef<Path>) -> Self {
        self.type_definitions = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the opcode and element-type tables
    pub fn metadata_tables(mut self, opcodes: impl AsRef<Path>, types: impl AsRef<Path>) -> Self {
        self.opcodes = Some(opcodes.as_ref().to_path_buf());
        self.types = Some(types.as_ref().to_path_buf());
        self
    }

    /// Set the source root used for git describe
    pub fn src_root(mut self, path: impl AsRef<Path>) -> Self {
        self.src_root = path.as_ref().to_path_buf();
        self
    }

    /// Set the fallback version file
    pub fn version_file(mut self, path: impl AsRef<Path>) -> Self {
        self.version_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use a fixed version instead of resolving one
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the bound on the git describe invocation
    pub fn git_timeout(mut self, timeout: Duration) -> Self {
        self.git_timeout = timeout;
        self
    }

    /// Set the prefix stripped from internal opcode identifiers
    pub fn opcode_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.opcode_prefix = prefix.into();
        self
    }

    /// Set the info artifact format
    pub fn info_format(mut self, format: InfoFormat) -> Self {
        self.info_format = format;
        self
    }

    /// Set the output directory (defaults to `OUT_DIR`)
    pub fn out_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.out_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the header file name
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Add additional files to watch for rebuilds
    pub fn watch(mut self, path: impl AsRef<Path>) -> Self {
        self.additional_watch.push(path.as_ref().to_path_buf());
        self
    }

    /// Whether both metadata tables are configured
    pub fn has_metadata_tables(&self) -> bool {
        self.opcodes.is_some() && self.types.is_some()
    }

    /// Extract, index and validate the exported API
    pub fn api_module(&self) -> Result<ApiModule, ApiBuilderError> {
        let path = self
            .provider_source
            .as_ref()
            .ok_or(ApiBuilderError::ProviderSourceNotSet)?;
        let source = read_input(path)?;

        let signatures = extract_signatures(&source, &self.names.prefix).map_err(|source| {
            ApiBuilderError::ExtractError {
                path: path.clone(),
                source,
            }
        })?;
        if signatures.is_empty() {
            warn!(
                source = %path.display(),
                prefix = %self.names.prefix,
                "no exported functions found; the API will be empty"
            );
        }

        let mut module = ApiModule::new(self.names.clone()).with_signatures(signatures);
        if let Some(ref doc) = self.doc {
            module = module.with_doc(doc.clone());
        }
        module.validate()?;
        debug!(functions = module.table_len(), "indexed exported functions");
        Ok(module)
    }

    /// Render the header text
    pub fn generate_header(&self) -> Result<String, ApiBuilderError> {
        // Fail before extraction so a header is never produced without types
        let type_definitions = self.read_type_definitions()?;
        let module = self.api_module()?;
        Ok(HeaderGenerator::new(&module).generate(&type_definitions))
    }

    fn read_type_definitions(&self) -> Result<String, ApiBuilderError> {
        let path = self
            .type_definitions
            .as_ref()
            .ok_or(ApiBuilderError::TypeDefinitionsNotSet)?;
        if !path.is_file() {
            return Err(ApiBuilderError::TypeDefinitionsNotFound(path.clone()));
        }
        read_input(path)
    }

    /// Resolve the version string
    pub fn resolve_version(&self) -> Result<String, ApiBuilderError> {
        if let Some(ref version) = self.version {
            return Ok(version.clone());
        }
        let mut resolver = VersionResolver::new(&self.src_root).timeout(self.git_timeout);
        if let Some(ref file) = self.version_file {
            resolver = resolver.fallback_file(file);
        }
        Ok(resolver.resolve()?)
    }

    /// Compile the info artifact contents
    pub fn info_artifact(&self) -> Result<InfoArtifact, ApiBuilderError> {
        let (Some(opcodes_path), Some(types_path)) = (&self.opcodes, &self.types) else {
            return Err(ApiBuilderError::MetadataTablesNotSet);
        };

        let opcodes = OpcodeTable::load(opcodes_path)?;
        let types = TypeTable::load(types_path)?;
        let op = OpcodeCompiler::new(&types)
            .with_prefix(self.opcode_prefix.clone())
            .compile(&opcodes)?;
        debug!(operations = op.len(), "compiled opcode metadata");

        Ok(InfoArtifact {
            version: self.resolve_version()?,
            op,
            types: types.supported_types(),
        })
    }

    /// Render the info artifact text
    pub fn generate_info(&self) -> Result<String, ApiBuilderError> {
        let info = self.info_artifact()?;
        Ok(InfoGenerator::new(&info).generate(self.info_format)?)
    }

    /// Generate and write all artifacts
    ///
    /// This will:
    /// 1. Write the header into the output directory
    /// 2. Write the info artifact when both metadata tables are set
    /// 3. Print cargo:rerun-if-changed directives when run from a build script
    pub fn build(self) -> Result<BuildOutput, ApiBuilderError> {
        let out_path = match self.out_dir {
            Some(ref dir) => dir.clone(),
            None => env::var("OUT_DIR")
                .map(PathBuf::from)
                .map_err(|_| ApiBuilderError::EnvVarMissing("OUT_DIR".to_string()))?,
        };

        // Render everything before touching the output directory
        let header = self.generate_header()?;
        let info = if self.has_metadata_tables() {
            Some(self.generate_info()?)
        } else {
            None
        };

        fs::create_dir_all(&out_path)?;

        let header_path = out_path.join(&self.header_name);
        fs::write(&header_path, &header)?;
        info!(path = %header_path.display(), "generated C API header");

        let info_path = match info {
            Some(info) => {
                let path = out_path.join(self.info_format.file_name());
                fs::write(&path, info)?;
                info!(path = %path.display(), "generated info artifact");
                Some(path)
            }
            None => None,
        };

        if env::var_os("OUT_DIR").is_some() {
            self.print_rerun_directives();
        }

        Ok(BuildOutput {
            header_path,
            info_path,
        })
    }

    fn print_rerun_directives(&self) {
        let inputs = [
            &self.provider_source,
            &self.type_definitions,
            &self.opcodes,
            &self.types,
            &self.version_file,
        ];
        for path in inputs.into_iter().flatten() {
            println!("cargo:rerun-if-changed={}", path.display());
        }
        for watch_path in &self.additional_watch {
            println!("cargo:rerun-if-changed={}", watch_path.display());
        }
    }
}

/// Output paths from a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Path to the generated header
    pub header_path: PathBuf,
    /// Path to the generated info artifact (if the metadata tables were set)
    pub info_path: Option<PathBuf>,
}

fn read_input(path: &Path) -> Result<String, ApiBuilderError> {
    fs::read_to_string(path).map_err(|source| ApiBuilderError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::config::PathsConfig;

    #[test]
    fn test_builder_from_config() {
        let config = GeneratorConfig {
            paths: PathsConfig {
                provider_source: Some(PathBuf::from("a.c")),
                out_dir: PathBuf::from("gen"),
                ..PathsConfig::default()
            },
            ..GeneratorConfig::default()
        };

        let builder = ApiBuilder::from_config(&config);
        assert_eq!(builder.provider_source, Some(PathBuf::from("a.c")));
        assert_eq!(builder.out_dir, Some(PathBuf::from("gen")));
        assert_eq!(builder.names.prefix, "BhAPI");
        assert!(!builder.has_metadata_tables());
    }

    #[test]
    fn test_missing_provider_source() {
        let err = ApiBuilder::new().api_module().unwrap_err();
        assert!(matches!(err, ApiBuilderError::ProviderSourceNotSet));
    }

    #[test]
    fn test_missing_type_definitions_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let err = ApiBuilder::new()
            .provider_source(dir.path().join("missing.c"))
            .type_definitions(dir.path().join("missing_types.h"))
            .generate_header()
            .unwrap_err();
        assert!(matches!(err, ApiBuilderError::TypeDefinitionsNotFound(_)));

        let err = ApiBuilder::new()
            .provider_source(dir.path().join("missing.c"))
            .generate_header()
            .unwrap_err();
        assert!(matches!(err, ApiBuilderError::TypeDefinitionsNotSet));
    }

    #[test]
    fn test_fixed_version_skips_resolution() {
        let builder = ApiBuilder::new().version("7.7.7");
        assert_eq!(builder.resolve_version().unwrap(), "7.7.7");
    }

    #[test]
    fn test_info_requires_tables() {
        let err = ApiBuilder::new().info_artifact().unwrap_err();
        assert!(matches!(err, ApiBuilderError::MetadataTablesNotSet));
    }
}
