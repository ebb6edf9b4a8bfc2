//! Symbol metadata for exported C API functions
//!
//! This module provides the structures describing functions that the
//! provider module exports through the pointer table, and the sequential
//! index assignment that both provider and consumer builds agree on.

use serde::{Deserialize, Serialize};

/// Signature of an exported function as written in the provider source
///
/// All three parts are kept as normalized source text: they are spliced
/// verbatim into the generated header macros.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Return type including qualifiers (e.g., "bhc_dtype" or "const char *")
    pub return_type: String,
    /// Function name without the export prefix (e.g., "flush")
    pub name: String,
    /// Parenthesized parameter list (e.g., "(void)" or "(int a, int b)")
    pub parameter_list: String,
}

impl FunctionSignature {
    /// Create a new signature
    pub fn new(
        return_type: impl Into<String>,
        name: impl Into<String>,
        parameter_list: impl Into<String>,
    ) -> Self {
        Self {
            return_type: return_type.into(),
            name: name.into(),
            parameter_list: parameter_list.into(),
        }
    }

    /// Get the exported C symbol for this function under `prefix`
    pub fn symbol(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.name)
    }

    /// Get a C prototype for this function (without `static` or terminator)
    pub fn to_c_prototype(&self, prefix: &str) -> String {
        format!(
            "{} {}{}",
            self.return_type,
            self.symbol(prefix),
            self.parameter_list
        )
    }
}

/// A signature paired with its slot in the function-pointer table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexedFunction {
    /// Slot in the pointer table
    pub index: usize,
    /// The function signature
    #[serde(flatten)]
    pub signature: FunctionSignature,
}

impl IndexedFunction {
    /// Function name without the export prefix
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Macro holding the table index (e.g., `BhAPI_flush_NUM`)
    pub fn index_macro(&self, prefix: &str) -> String {
        format!("{}_NUM", self.signature.symbol(prefix))
    }

    /// Macro holding the return type (e.g., `BhAPI_flush_RETURN`)
    pub fn return_macro(&self, prefix: &str) -> String {
        format!("{}_RETURN", self.signature.symbol(prefix))
    }

    /// Macro holding the parameter list (e.g., `BhAPI_flush_PROTO`)
    pub fn proto_macro(&self, prefix: &str) -> String {
        format!("{}_PROTO", self.signature.symbol(prefix))
    }
}

/// Assign table indices in discovery order.
///
/// Indices are `0..signatures.len()` with no reordering or deduplication,
/// so identical input always yields identical indices.
pub fn assign_indices(signatures: Vec<FunctionSignature>) -> Vec<IndexedFunction> {
    signatures
        .into_iter()
        .enumerate()
        .map(|(index, signature)| IndexedFunction { index, signature })
        .collect()
}
