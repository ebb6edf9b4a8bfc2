//! Intermediate Representation (IR) for the generated C API
//!
//! This module provides the metadata structures for exported provider
//! functions, the API module as a whole, and the opcode/type records that
//! feed the runtime metadata table.

pub mod module;
pub mod opcode;
pub mod symbol;

pub use module::*;
pub use opcode::*;
pub use symbol::*;
