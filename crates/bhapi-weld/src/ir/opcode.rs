//! Declarative opcode and element-type records
//!
//! These mirror the entries of the codegen tables (`opcodes.json`,
//! `types.json`) and the descriptors produced from them. Numeric and
//! boolean fields are accepted in either their native JSON form or as
//! strings/integers, since the tables are hand-edited.

use serde::{Deserialize, Deserializer, Serialize};

/// Native name marking an element type without an equivalent on the native side
pub const UNKNOWN_NATIVE_TYPE: &str = "unknown";

/// One entry of the declarative opcode table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeEntry {
    /// Internal identifier (e.g., "BH_ADD")
    pub opcode: String,
    /// Numeric opcode id
    #[serde(deserialize_with = "lenient_u32")]
    pub id: u32,
    /// Number of operands (output included)
    #[serde(deserialize_with = "lenient_u32")]
    pub nop: u32,
    /// Whether the operation is elementwise
    #[serde(deserialize_with = "lenient_bool")]
    pub elementwise: bool,
    /// Internal control opcode, not part of the public operation surface
    #[serde(default, deserialize_with = "lenient_bool")]
    pub system_opcode: bool,
    /// Accepted type signatures, one internal type tag per operand
    #[serde(default)]
    pub types: Vec<Vec<String>>,
}

impl OpcodeEntry {
    /// Create a new public opcode entry
    pub fn new(opcode: impl Into<String>, id: u32, nop: u32) -> Self {
        Self {
            opcode: opcode.into(),
            id,
            nop,
            elementwise: false,
            system_opcode: false,
            types: Vec::new(),
        }
    }

    /// Mark as elementwise
    pub fn elementwise(mut self) -> Self {
        self.elementwise = true;
        self
    }

    /// Mark as a system opcode
    pub fn system(mut self) -> Self {
        self.system_opcode = true;
        self
    }

    /// Add a type signature
    pub fn signature(mut self, tags: &[&str]) -> Self {
        self.types.push(tags.iter().map(|t| t.to_string()).collect());
        self
    }
}

/// One entry of the declarative element-type table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementType {
    /// Internal type tag (e.g., "BH_FLOAT32")
    #[serde(rename = "enum")]
    pub tag: String,
    /// Native type name (e.g., "float32"), or "unknown"
    #[serde(rename = "numpy")]
    pub native: String,
}

impl ElementType {
    /// Create a new element type
    pub fn new(tag: impl Into<String>, native: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            native: native.into(),
        }
    }

    /// Native name, if this type has a native equivalent
    pub fn native_name(&self) -> Option<&str> {
        if self.native.is_empty() || self.native == UNKNOWN_NATIVE_TYPE {
            None
        } else {
            Some(&self.native)
        }
    }
}

/// Runtime descriptor of a public operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeDescriptor {
    /// Public operation name (e.g., "add")
    pub name: String,
    /// Numeric opcode id
    pub id: u32,
    /// Number of operands
    pub nop: u32,
    /// Whether the operation is elementwise
    pub elementwise: bool,
    /// Accepted type signatures in native type names
    pub type_sig: Vec<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrNumber {
    Bool(bool),
    Number(i64),
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n,
        NumberOrString::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| D::Error::custom(format!("expected an integer, found {:?}", s)))?,
    };
    u32::try_from(value).map_err(|_| D::Error::custom(format!("{} is out of range", value)))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match BoolOrNumber::deserialize(deserializer)? {
        BoolOrNumber::Bool(b) => b,
        BoolOrNumber::Number(n) => n != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_entry_from_json() {
        let entry: OpcodeEntry = serde_json::from_str(
            r#"{
                "opcode": "BH_ADD",
                "id": "5",
                "nop": 3,
                "elementwise": 1,
                "system_opcode": false,
                "types": [["BH_FLOAT32", "BH_FLOAT32", "BH_FLOAT32"]],
                "doc": "Add arguments element-wise."
            }"#,
        )
        .unwrap();

        assert_eq!(entry.opcode, "BH_ADD");
        assert_eq!(entry.id, 5);
        assert_eq!(entry.nop, 3);
        assert!(entry.elementwise);
        assert!(!entry.system_opcode);
        assert_eq!(entry.types.len(), 1);
    }

    #[test]
    fn test_opcode_entry_rejects_bad_id() {
        let result: Result<OpcodeEntry, _> = serde_json::from_str(
            r#"{"opcode": "BH_ADD", "id": "five", "nop": 3, "elementwise": true}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_element_type_native_name() {
        let t: ElementType =
            serde_json::from_str(r#"{"enum": "BH_FLOAT32", "numpy": "float32", "c": "float"}"#)
                .unwrap();
        assert_eq!(t.native_name(), Some("float32"));

        let r = ElementType::new("BH_R123", UNKNOWN_NATIVE_TYPE);
        assert_eq!(r.native_name(), None);
    }

    #[test]
    fn test_opcode_entry_builder() {
        let entry = OpcodeEntry::new("BH_ADD", 5, 3)
            .elementwise()
            .signature(&["BH_INT32", "BH_INT32", "BH_INT32"]);
        assert!(entry.elementwise);
        assert!(!entry.system_opcode);
        assert_eq!(entry.types[0], vec!["BH_INT32"; 3]);
    }
}
