//! Module metadata for the generated C API
//!
//! This module provides the ApiModule structure that represents the whole
//! exported surface of the provider: its indexed functions and the names
//! used by the generated header (prefix, guards, table and capsule key).

use crate::ir::{assign_indices, FunctionSignature, IndexedFunction};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Names used when rendering the C API header
///
/// Defaults match the Bohrium Python API so existing consumers keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiNames {
    /// Export prefix of provider functions (e.g., "BhAPI")
    pub prefix: String,
    /// Include guard macro
    pub guard: String,
    /// Macro defined only when compiling the provider module
    pub module_flag: String,
    /// Macro a consumer defines to reference, not define, the shared table
    pub no_import_flag: String,
    /// Name of the shared pointer-table variable in consumer builds
    pub table_name: String,
    /// Provider-side initializer that fills the pointer table
    pub init_function: String,
    /// Consumer-side import routine
    pub import_function: String,
    /// Key the provider publishes its table under
    pub capsule_key: String,
    /// C function performing the name-keyed lookup `(const char *, int) -> void *`
    pub lookup_function: String,
}

impl Default for ApiNames {
    fn default() -> Self {
        Self {
            prefix: "BhAPI".to_string(),
            guard: "BH_API_H".to_string(),
            module_flag: "BhAPI_MODULE".to_string(),
            no_import_flag: "NO_IMPORT_BH_API".to_string(),
            table_name: "PyBhAPI".to_string(),
            init_function: "init_c_api_struct".to_string(),
            import_function: "import_bh_api".to_string(),
            capsule_key: "bohrium_api._C_API".to_string(),
            lookup_function: "PyCapsule_Import".to_string(),
        }
    }
}

impl ApiNames {
    /// Total-count macro (e.g., `BhAPI_num_of_pointers`)
    pub fn count_macro(&self) -> String {
        format!("{}_num_of_pointers", self.prefix)
    }

    fn identifiers(&self) -> [(&'static str, &str); 8] {
        [
            ("prefix", &self.prefix),
            ("guard", &self.guard),
            ("module_flag", &self.module_flag),
            ("no_import_flag", &self.no_import_flag),
            ("table_name", &self.table_name),
            ("init_function", &self.init_function),
            ("import_function", &self.import_function),
            ("lookup_function", &self.lookup_function),
        ]
    }
}

/// The complete exported API of a provider module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiModule {
    /// Header naming
    pub names: ApiNames,

    /// Exported functions in table order
    pub functions: Vec<IndexedFunction>,

    /// Module documentation, rendered into the header banner
    pub doc: Option<String>,
}

impl ApiModule {
    /// Create an empty module with the given names
    pub fn new(names: ApiNames) -> Self {
        Self {
            names,
            functions: Vec::new(),
            doc: None,
        }
    }

    /// Index the signatures in discovery order and use them as the function list
    pub fn with_signatures(mut self, signatures: Vec<FunctionSignature>) -> Self {
        self.functions = assign_indices(signatures);
        self
    }

    /// Append a function at the next free index
    pub fn function(mut self, signature: FunctionSignature) -> Self {
        let index = self.functions.len();
        self.functions.push(IndexedFunction { index, signature });
        self
    }

    /// Set documentation
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Number of slots in the pointer table
    pub fn table_len(&self) -> usize {
        self.functions.len()
    }

    /// Get all function names in table order
    pub fn function_names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name()).collect()
    }

    /// Validate the module configuration
    pub fn validate(&self) -> Result<(), ModuleValidationError> {
        for (field, value) in self.names.identifiers() {
            if value.is_empty() {
                return Err(ModuleValidationError::EmptyName(field));
            }
            if !is_c_identifier(value) {
                return Err(ModuleValidationError::InvalidIdentifier {
                    field,
                    value: value.to_string(),
                });
            }
        }

        if self.names.capsule_key.is_empty() {
            return Err(ModuleValidationError::EmptyName("capsule_key"));
        }
        if self.names.capsule_key.contains(['"', '\\', '\n']) {
            return Err(ModuleValidationError::InvalidCapsuleKey(
                self.names.capsule_key.clone(),
            ));
        }

        // Check for duplicate function names; they would share one macro namespace
        let mut seen = HashSet::new();
        for f in &self.functions {
            if !seen.insert(f.name()) {
                return Err(ModuleValidationError::DuplicateFunction(f.name().to_string()));
            }
        }

        for (expected, f) in self.functions.iter().enumerate() {
            if f.index != expected {
                return Err(ModuleValidationError::IndexGap {
                    name: f.name().to_string(),
                    expected,
                    found: f.index,
                });
            }
        }

        Ok(())
    }
}

/// Check that `s` is usable as a C identifier
pub fn is_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Errors that can occur during module validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleValidationError {
    /// A header name is empty
    EmptyName(&'static str),
    /// A header name is not a C identifier
    InvalidIdentifier { field: &'static str, value: String },
    /// The capsule key cannot be embedded in a C string literal
    InvalidCapsuleKey(String),
    /// Two exported functions share a name
    DuplicateFunction(String),
    /// Function indices are not the contiguous range `0..N`
    IndexGap {
        name: String,
        expected: usize,
        found: usize,
    },
}

impl std::fmt::Display for ModuleValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleValidationError::EmptyName(field) => write!(f, "{} cannot be empty", field),
            ModuleValidationError::InvalidIdentifier { field, value } => {
                write!(f, "{} is not a valid C identifier: {:?}", field, value)
            }
            ModuleValidationError::InvalidCapsuleKey(key) => {
                write!(f, "capsule key cannot be used in a C string literal: {:?}", key)
            }
            ModuleValidationError::DuplicateFunction(name) => {
                write!(f, "duplicate exported function: {}", name)
            }
            ModuleValidationError::IndexGap {
                name,
                expected,
                found,
            } => write!(
                f,
                "function {} has index {} but slot {} was expected",
                name, found, expected
            ),
        }
    }
}

impl std::error::Error for ModuleValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(name: &str) -> FunctionSignature {
        FunctionSignature::new("void", name, "(void)")
    }

    #[test]
    fn test_module_creation() {
        let module = ApiModule::new(ApiNames::default())
            .with_signatures(vec![sig("flush"), sig("sync")])
            .with_doc("Bohrium C API");

        assert_eq!(module.table_len(), 2);
        assert_eq!(module.function_names(), vec!["flush", "sync"]);
        assert_eq!(module.names.count_macro(), "BhAPI_num_of_pointers");
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_module_validation() {
        let module = ApiModule::new(ApiNames {
            prefix: String::new(),
            ..ApiNames::default()
        });
        assert_eq!(
            module.validate(),
            Err(ModuleValidationError::EmptyName("prefix"))
        );

        let module = ApiModule::new(ApiNames {
            table_name: "1table".to_string(),
            ..ApiNames::default()
        });
        assert!(matches!(
            module.validate(),
            Err(ModuleValidationError::InvalidIdentifier { field: "table_name", .. })
        ));

        let module = ApiModule::new(ApiNames::default())
            .function(sig("flush"))
            .function(sig("flush")); // Duplicate
        assert_eq!(
            module.validate(),
            Err(ModuleValidationError::DuplicateFunction("flush".to_string()))
        );
    }

    #[test]
    fn test_capsule_key_must_be_literal_safe() {
        let module = ApiModule::new(ApiNames {
            capsule_key: "bad\"key".to_string(),
            ..ApiNames::default()
        });
        assert!(matches!(
            module.validate(),
            Err(ModuleValidationError::InvalidCapsuleKey(_))
        ));
    }

    #[test]
    fn test_is_c_identifier() {
        assert!(is_c_identifier("BhAPI"));
        assert!(is_c_identifier("_x1"));
        assert!(!is_c_identifier("9lives"));
        assert!(!is_c_identifier("with-dash"));
        assert!(!is_c_identifier(""));
    }
}
