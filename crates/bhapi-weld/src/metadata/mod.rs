//! Opcode metadata compilation
//!
//! Translates the declarative opcode and element-type tables into the
//! runtime descriptor mapping and the supported-type list embedded in the
//! generated info artifact.

use crate::ir::{ElementType, OpcodeDescriptor, OpcodeEntry};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Default prefix of internal opcode identifiers
pub const DEFAULT_OPCODE_PREFIX: &str = "BH_";

/// Errors that can occur while reading or compiling the tables
#[derive(Debug, Error)]
pub enum MetadataError {
    /// A table file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A table could not be decoded
    #[error("invalid {table} table: {source}")]
    Json {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// An opcode does not carry the fixed prefix
    #[error("opcode {opcode} (id {id}) does not start with `{prefix}`")]
    MissingPrefix {
        opcode: String,
        id: u32,
        prefix: String,
    },

    /// Two opcodes map to the same public name
    #[error("opcodes {first} and {second} both map to the public name `{name}`")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },
}

/// The declarative element-type table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTable {
    entries: Vec<ElementType>,
}

impl TypeTable {
    /// Create a table from entries in declaration order
    pub fn new(entries: Vec<ElementType>) -> Self {
        Self { entries }
    }

    /// Decode a table from JSON text
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(json)
            .map(Self::new)
            .map_err(|source| MetadataError::Json {
                table: "type",
                source,
            })
    }

    /// Read a table from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        Self::from_json(&read_table(path.as_ref())?)
    }

    /// Get all entries
    pub fn entries(&self) -> &[ElementType] {
        &self.entries
    }

    /// Native names of every type that has one, in declaration order
    pub fn supported_types(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|t| t.native_name())
            .map(str::to_string)
            .collect()
    }

    fn native_lookup(&self) -> HashMap<&str, &str> {
        let mut map = HashMap::new();
        for entry in &self.entries {
            if let Some(native) = entry.native_name() {
                map.entry(entry.tag.as_str()).or_insert(native);
            }
        }
        map
    }
}

/// The declarative opcode table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpcodeTable {
    entries: Vec<OpcodeEntry>,
}

impl OpcodeTable {
    /// Create a table from entries
    pub fn new(entries: Vec<OpcodeEntry>) -> Self {
        Self { entries }
    }

    /// Decode a table from JSON text
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(json)
            .map(Self::new)
            .map_err(|source| MetadataError::Json {
                table: "opcode",
                source,
            })
    }

    /// Read a table from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        Self::from_json(&read_table(path.as_ref())?)
    }

    /// Get all entries
    pub fn entries(&self) -> &[OpcodeEntry] {
        &self.entries
    }

    /// Entries that belong to the public operation surface
    pub fn public_entries(&self) -> impl Iterator<Item = &OpcodeEntry> {
        self.entries.iter().filter(|op| !op.system_opcode)
    }
}

fn read_table(path: &Path) -> Result<String, MetadataError> {
    fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Compiler from declarative tables to runtime descriptors
pub struct OpcodeCompiler<'a> {
    types: &'a TypeTable,
    prefix: String,
}

impl<'a> OpcodeCompiler<'a> {
    /// Create a compiler translating type tags through `types`
    pub fn new(types: &'a TypeTable) -> Self {
        Self {
            types,
            prefix: DEFAULT_OPCODE_PREFIX.to_string(),
        }
    }

    /// Set the prefix stripped from internal opcode identifiers
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Derive the public name of an opcode (e.g., "BH_ADD" -> "add")
    pub fn public_name(&self, entry: &OpcodeEntry) -> Result<String, MetadataError> {
        entry
            .opcode
            .strip_prefix(&self.prefix)
            .filter(|rest| !rest.is_empty())
            .map(str::to_lowercase)
            .ok_or_else(|| MetadataError::MissingPrefix {
                opcode: entry.opcode.clone(),
                id: entry.id,
                prefix: self.prefix.clone(),
            })
    }

    /// Compile the public opcodes into a name-keyed descriptor mapping
    ///
    /// System opcodes are skipped. Signature rows that mention a type with
    /// no native equivalent are dropped from their descriptor.
    pub fn compile(
        &self,
        opcodes: &OpcodeTable,
    ) -> Result<BTreeMap<String, OpcodeDescriptor>, MetadataError> {
        let lookup = self.types.native_lookup();
        let mut descriptors: BTreeMap<String, OpcodeDescriptor> = BTreeMap::new();
        let mut sources: HashMap<String, &str> = HashMap::new();

        for entry in opcodes.public_entries() {
            let name = self.public_name(entry)?;

            if let Some(first) = sources.insert(name.clone(), entry.opcode.as_str()) {
                return Err(MetadataError::DuplicateName {
                    name,
                    first: first.to_string(),
                    second: entry.opcode.clone(),
                });
            }

            let type_sig = translate_rows(&entry.types, &lookup, &entry.opcode);
            debug!(
                opcode = %entry.opcode,
                name = %name,
                rows = type_sig.len(),
                "compiled opcode"
            );

            descriptors.insert(
                name.clone(),
                OpcodeDescriptor {
                    name,
                    id: entry.id,
                    nop: entry.nop,
                    elementwise: entry.elementwise,
                    type_sig,
                },
            );
        }

        Ok(descriptors)
    }
}

fn translate_rows(
    rows: &[Vec<String>],
    lookup: &HashMap<&str, &str>,
    opcode: &str,
) -> Vec<Vec<String>> {
    rows.iter()
        .filter_map(|row| {
            let translated: Option<Vec<String>> = row
                .iter()
                .map(|tag| lookup.get(tag.as_str()).map(|n| n.to_string()))
                .collect();
            if translated.is_none() {
                debug!(opcode, row = ?row, "dropping signature with unmapped type");
            }
            translated
        })
        .collect()
}
