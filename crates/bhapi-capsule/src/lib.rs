//! BhAPI-Capsule: process-wide registry of C API function-pointer tables
//!
//! A provider module builds a table of function addresses and publishes it
//! once under a fixed key. Consumer modules loaded independently acquire the
//! table by key and call through it, with no link-time dependency on the
//! provider. The generated header's import routine drives the same registry
//! through the C ABI in [`ffi`].
//!
//! # One registry per process
//!
//! The registry is a `static` of this crate, so it is shared only by code
//! that links the same copy. Providers and consumers built as separate
//! shared libraries must all go through the `cdylib` build of this crate
//! (loaded once, e.g. with `RTLD_GLOBAL`) and its `bh_capsule_*` symbols.
//! Statically linking the rlib into two libraries gives each its own
//! registry, and `acquire` in one will not see tables published in the
//! other.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bhapi_capsule::{publish, ApiImport, TableBuilder};
//!
//! // Provider
//! let table = TableBuilder::new(2)
//!     .set(0, flush as *const _)?
//!     .set(1, message as *const _)?
//!     .finish()?;
//! publish("bohrium_api._C_API", table)?;
//!
//! // Consumer
//! static BH_API: ApiImport = ApiImport::new("bohrium_api._C_API");
//! let table = BH_API.import()?;
//! ```

pub mod ffi;
pub mod import;
pub mod registry;
pub mod table;

pub use import::ApiImport;
pub use registry::{acquire, is_published, publish};
pub use table::{FunctionTable, TableBuilder};

use thiserror::Error;

/// Errors raised by the registry and table builder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapsuleError {
    /// Registry keys must be non-empty
    #[error("capsule key cannot be empty")]
    EmptyKey,

    /// The key already holds a table
    #[error("a table is already published under {0:?}")]
    AlreadyPublished(String),

    /// Nothing has been published under the key yet
    #[error("no table is published under {0:?}")]
    NotPublished(String),

    /// A slot index past the end of the table
    #[error("slot {index} is out of range for a table of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    /// A null function address
    #[error("slot {0} cannot hold a null pointer")]
    NullPointer(usize),

    /// A slot was never filled
    #[error("slot {0} was never set")]
    TableIncomplete(usize),

    /// A key passed through the C ABI is not UTF-8
    #[error("capsule key is not valid UTF-8")]
    InvalidKey,
}
