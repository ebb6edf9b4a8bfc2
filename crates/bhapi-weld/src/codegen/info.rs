//! Info artifact generator
//!
//! The info artifact bundles the resolved version string, the public
//! operation descriptors and the supported element types. It is rendered
//! either as JSON or as a Python module exposing `__version__`, `op` and
//! `numpy_types()`.

use crate::ir::OpcodeDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

/// Contents of the generated info artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoArtifact {
    /// Resolved version string
    pub version: String,
    /// Public operation name to descriptor
    pub op: BTreeMap<String, OpcodeDescriptor>,
    /// Supported native element types in declaration order
    pub types: Vec<String>,
}

/// Output format of the info artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoFormat {
    /// `_info.json`
    #[default]
    Json,
    /// `_info.py`
    Python,
}

impl InfoFormat {
    /// Conventional file name for this format
    pub fn file_name(&self) -> &'static str {
        match self {
            InfoFormat::Json => "_info.json",
            InfoFormat::Python => "_info.py",
        }
    }
}

impl FromStr for InfoFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(InfoFormat::Json),
            "python" | "py" => Ok(InfoFormat::Python),
            other => Err(format!("unknown info format: {} (expected json or python)", other)),
        }
    }
}

/// Generator for the info artifact
pub struct InfoGenerator<'a> {
    info: &'a InfoArtifact,
}

impl<'a> InfoGenerator<'a> {
    /// Create a new info generator
    pub fn new(info: &'a InfoArtifact) -> Self {
        Self { info }
    }

    /// Render in the requested format
    pub fn generate(&self, format: InfoFormat) -> Result<String, serde_json::Error> {
        match format {
            InfoFormat::Json => self.generate_json(),
            InfoFormat::Python => Ok(self.generate_python()),
        }
    }

    /// Render as pretty-printed JSON
    pub fn generate_json(&self) -> Result<String, serde_json::Error> {
        let mut output = serde_json::to_string_pretty(self.info)?;
        output.push('\n');
        Ok(output)
    }

    /// Render as a Python module
    pub fn generate_python(&self) -> String {
        let mut output = String::new();
        output.push_str("# This file is auto generated by bhapi-weld\n");

        output.push_str("\n# Info variables:\n");
        let _ = writeln!(output, "__version__ = {}", py_str(&self.info.version));
        output.push('\n');

        output.push_str("op = {\n");
        for (name, desc) in &self.info.op {
            let _ = writeln!(
                output,
                "  {}: {{'elementwise': {}, 'id': {}, 'name': {}, 'nop': {}, 'type_sig': {}}},",
                py_str(name),
                if desc.elementwise { "True" } else { "False" },
                desc.id,
                py_str(&desc.name),
                desc.nop,
                py_rows(&desc.type_sig)
            );
        }
        output.push_str("}\n\n");

        let dtypes: Vec<String> = self
            .info
            .types
            .iter()
            .map(|t| format!("numpy.dtype({})", py_str(t)))
            .collect();
        output.push_str("def numpy_types():\n");
        output.push_str("    import numpy\n");
        let _ = writeln!(output, "    return [{}]", dtypes.join(", "));
        output
    }
}

fn py_str(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn py_rows(rows: &[Vec<String>]) -> String {
    let rows: Vec<String> = rows
        .iter()
        .map(|row| {
            let items: Vec<String> = row.iter().map(|t| py_str(t)).collect();
            format!("[{}]", items.join(", "))
        })
        .collect();
    format!("[{}]", rows.join(", "))
}
