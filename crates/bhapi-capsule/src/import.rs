//! Consumer-side import handle

use crate::registry::acquire;
use crate::table::FunctionTable;
use crate::CapsuleError;
use once_cell::sync::OnceCell;
use std::ffi::c_void;

/// Cached handle to a table published under a fixed key
///
/// Meant to live in a `static`, like the header's shared table variable.
/// The lookup happens on the first successful `import`; later calls return
/// the cached table. A failed import caches nothing and can be retried once
/// the provider has been loaded.
#[derive(Debug)]
pub struct ApiImport {
    key: &'static str,
    table: OnceCell<&'static FunctionTable>,
}

impl ApiImport {
    /// Create a handle for `key`
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            table: OnceCell::new(),
        }
    }

    /// The key this handle imports
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Import the table, performing the lookup at most once
    pub fn import(&self) -> Result<&'static FunctionTable, CapsuleError> {
        self.table.get_or_try_init(|| acquire(self.key)).copied()
    }

    /// Whether a previous import succeeded
    pub fn is_imported(&self) -> bool {
        self.table.get().is_some()
    }

    /// The imported table, if any
    pub fn table(&self) -> Option<&'static FunctionTable> {
        self.table.get().copied()
    }

    /// Address at `index` of the imported table
    pub fn function(&self, index: usize) -> Option<*const c_void> {
        self.table()?.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::publish;
    use crate::table::TableBuilder;

    extern "C" fn answer() -> i32 {
        42
    }

    #[test]
    fn test_import_is_idempotent() {
        static IMPORT: ApiImport = ApiImport::new("import.idempotent");
        publish(
            "import.idempotent",
            TableBuilder::new(1)
                .set(0, answer as *const c_void)
                .unwrap()
                .finish()
                .unwrap(),
        )
        .unwrap();

        let first = IMPORT.import().unwrap();
        let second = IMPORT.import().unwrap();

        assert!(std::ptr::eq(first, second));
        assert!(IMPORT.is_imported());
        assert_eq!(IMPORT.function(0), Some(answer as *const c_void));
    }

    #[test]
    fn test_failed_import_can_be_retried() {
        let import = ApiImport::new("import.retry");

        assert_eq!(
            import.import().unwrap_err(),
            CapsuleError::NotPublished("import.retry".to_string())
        );
        assert!(!import.is_imported());
        assert_eq!(import.function(0), None);

        publish("import.retry", TableBuilder::new(0).finish().unwrap()).unwrap();
        assert!(import.import().unwrap().is_empty());
        assert_eq!(import.key(), "import.retry");
    }
}
