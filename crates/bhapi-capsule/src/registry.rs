//! Write-once registry keyed by capsule name
//!
//! Published tables live for the rest of the process, so acquired
//! references are `'static` and consumers can cache them freely.

use crate::table::FunctionTable;
use crate::CapsuleError;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

static REGISTRY: Lazy<RwLock<HashMap<String, &'static FunctionTable>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Publish `table` under `key`
///
/// Each key can be published once; a second publish fails and leaves the
/// first table in place.
pub fn publish(key: &str, table: FunctionTable) -> Result<&'static FunctionTable, CapsuleError> {
    if key.is_empty() {
        return Err(CapsuleError::EmptyKey);
    }

    let mut registry = REGISTRY.write();
    if registry.contains_key(key) {
        return Err(CapsuleError::AlreadyPublished(key.to_string()));
    }

    let len = table.len();
    let table: &'static FunctionTable = Box::leak(Box::new(table));
    registry.insert(key.to_string(), table);
    info!(key = %key, slots = len, "published C API table");
    Ok(table)
}

/// Look up the table published under `key`
pub fn acquire(key: &str) -> Result<&'static FunctionTable, CapsuleError> {
    if key.is_empty() {
        return Err(CapsuleError::EmptyKey);
    }

    let table = REGISTRY
        .read()
        .get(key)
        .copied()
        .ok_or_else(|| CapsuleError::NotPublished(key.to_string()))?;
    debug!(key = %key, slots = table.len(), "acquired C API table");
    Ok(table)
}

/// Whether a table is published under `key`
pub fn is_published(key: &str) -> bool {
    REGISTRY.read().contains_key(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;
    use std::ffi::c_void;

    extern "C" fn flush() {}

    fn table() -> FunctionTable {
        TableBuilder::new(1)
            .set(0, flush as *const c_void)
            .unwrap()
            .finish()
            .unwrap()
    }

    #[test]
    fn test_publish_then_acquire() {
        let published = publish("registry.publish_then_acquire", table()).unwrap();
        let acquired = acquire("registry.publish_then_acquire").unwrap();

        assert!(std::ptr::eq(published, acquired));
        assert_eq!(acquired.get(0), Some(flush as *const c_void));
        assert!(is_published("registry.publish_then_acquire"));
    }

    #[test]
    fn test_publish_is_write_once() {
        let first = publish("registry.write_once", table()).unwrap();
        let empty = TableBuilder::new(0).finish().unwrap();
        let err = publish("registry.write_once", empty).unwrap_err();

        assert_eq!(err, CapsuleError::AlreadyPublished("registry.write_once".to_string()));
        assert!(std::ptr::eq(acquire("registry.write_once").unwrap(), first));
        assert_eq!(acquire("registry.write_once").unwrap().len(), 1);
    }

    #[test]
    fn test_acquire_unpublished() {
        assert_eq!(
            acquire("registry.never_published").unwrap_err(),
            CapsuleError::NotPublished("registry.never_published".to_string())
        );
        assert!(!is_published("registry.never_published"));
    }

    #[test]
    fn test_empty_key() {
        assert_eq!(publish("", table()).unwrap_err(), CapsuleError::EmptyKey);
        assert_eq!(acquire("").unwrap_err(), CapsuleError::EmptyKey);
    }
}
