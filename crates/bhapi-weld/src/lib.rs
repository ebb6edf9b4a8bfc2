//! BhAPI-Weld: build-time generator for the Bohrium cross-module C API
//!
//! A provider C module defines its exported functions as
//! `static <ret> BhAPI_<name>(<params>) { ... }`. This crate extracts those
//! definitions, numbers them, and emits one header that both sides include:
//! the provider gets prototypes plus a table initializer, consumers get
//! call-through macros and an import routine that fetches the table once.
//! It also compiles the declarative opcode and element-type tables into an
//! info artifact stamped with the resolved version.
//!
//! # Architecture
//!
//! - `ir`: Signatures, indexed functions, header naming, opcode records
//! - `extract`: Tokenizer and signature extractor for the provider source
//! - `metadata`: Opcode and element-type tables and the descriptor compiler
//! - `codegen`: Header and info artifact rendering
//! - `build`: Pipeline builder, configuration and version resolution
//!
//! # Usage
//!
//! In a `build.rs`:
//!
//! ```rust,ignore
//! use bhapi_weld::build::ApiBuilder;
//!
//! fn main() {
//!     ApiBuilder::new()
//!         .provider_source("src/_bh_api.c")
//!         .type_definitions("../c/out/bhc_types.h")
//!         .metadata_tables("../../core/codegen/opcodes.json", "../../core/codegen/types.json")
//!         .src_root("../..")
//!         .build()
//!         .expect("Failed to generate the C API");
//! }
//! ```

pub mod build;
pub mod codegen;
pub mod extract;
pub mod ir;
pub mod metadata;

// Re-export commonly used types
pub use build::{
    parse_describe, ApiBuilder, ApiBuilderError, BuildOutput, ConfigError, GeneratorConfig,
    VersionError, VersionResolver, VersionSource,
};
pub use codegen::{HeaderGenerator, InfoArtifact, InfoFormat, InfoGenerator};
pub use extract::{extract_signatures, ExtractError};
pub use ir::{
    assign_indices, ApiModule, ApiNames, ElementType, FunctionSignature, IndexedFunction,
    ModuleValidationError, OpcodeDescriptor, OpcodeEntry,
};
pub use metadata::{MetadataError, OpcodeCompiler, OpcodeTable, TypeTable};
