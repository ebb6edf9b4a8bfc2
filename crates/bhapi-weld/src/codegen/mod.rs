//! Code generation for the C API
//!
//! This module provides generators for:
//! - The C API header shared by provider and consumer modules
//! - The info artifact (version, opcode descriptors, supported types)

pub mod header;
pub mod info;

pub use header::HeaderGenerator;
pub use info::{InfoArtifact, InfoFormat, InfoGenerator};
