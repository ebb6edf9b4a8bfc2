//! Function-pointer tables
//!
//! A table is a fixed-length array of function addresses. Slot `i` holds
//! the function whose generated `_NUM` macro expands to `i`, so the array
//! layout is exactly what the header's call-through macros index into.

use crate::CapsuleError;
use std::ffi::c_void;
use std::fmt;
use std::ptr;

/// An immutable, fully populated function-pointer table
pub struct FunctionTable {
    slots: Box<[*const c_void]>,
}

// SAFETY: the table only stores function addresses and never dereferences
// them; the slots are never mutated after `finish`.
unsafe impl Send for FunctionTable {}
unsafe impl Sync for FunctionTable {}

impl FunctionTable {
    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Address stored at `index`
    pub fn get(&self, index: usize) -> Option<*const c_void> {
        self.slots.get(index).copied()
    }

    /// All slots in index order
    pub fn as_slice(&self) -> &[*const c_void] {
        &self.slots
    }

    /// Pointer to the first slot, as C consumers index it
    pub fn as_ptr(&self) -> *const *const c_void {
        self.slots.as_ptr()
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter()).finish()
    }
}

/// Builder filling a table slot by slot
#[derive(Debug)]
pub struct TableBuilder {
    slots: Vec<*const c_void>,
}

impl TableBuilder {
    /// Create a builder for a table of `len` slots
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![ptr::null(); len],
        }
    }

    /// Store a function address at `index`
    pub fn set(mut self, index: usize, function: *const c_void) -> Result<Self, CapsuleError> {
        if function.is_null() {
            return Err(CapsuleError::NullPointer(index));
        }
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(CapsuleError::IndexOutOfRange { index, len })?;
        *slot = function;
        Ok(self)
    }

    /// Let a generated initializer fill the slots
    ///
    /// # Safety
    ///
    /// `init` must write at most `len` slots, which holds for the header's
    /// initializer when `len` is the generated pointer count.
    pub unsafe fn init_from(mut self, init: unsafe extern "C" fn(*mut *mut c_void)) -> Self {
        init(self.slots.as_mut_ptr() as *mut *mut c_void);
        self
    }

    /// Finish the table; every slot must be set
    pub fn finish(self) -> Result<FunctionTable, CapsuleError> {
        if let Some(index) = self.slots.iter().position(|p| p.is_null()) {
            return Err(CapsuleError::TableIncomplete(index));
        }
        Ok(FunctionTable {
            slots: self.slots.into_boxed_slice(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn one() -> i32 {
        1
    }

    extern "C" fn two() -> i32 {
        2
    }

    unsafe extern "C" fn init_c_api_struct(c_api_struct: *mut *mut c_void) {
        *c_api_struct.add(0) = one as *mut c_void;
        *c_api_struct.add(1) = two as *mut c_void;
    }

    #[test]
    fn test_build_table() {
        let table = TableBuilder::new(2)
            .set(1, two as *const c_void)
            .unwrap()
            .set(0, one as *const c_void)
            .unwrap()
            .finish()
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0), Some(one as *const c_void));
        assert_eq!(table.get(1), Some(two as *const c_void));
        assert_eq!(table.get(2), None);

        let f: extern "C" fn() -> i32 = unsafe { std::mem::transmute(table.as_slice()[1]) };
        assert_eq!(f(), 2);
    }

    #[test]
    fn test_incomplete_table() {
        let err = TableBuilder::new(3)
            .set(0, one as *const c_void)
            .unwrap()
            .finish()
            .unwrap_err();
        assert_eq!(err, CapsuleError::TableIncomplete(1));
    }

    #[test]
    fn test_set_rejects_bad_slots() {
        assert_eq!(
            TableBuilder::new(1).set(1, one as *const c_void).unwrap_err(),
            CapsuleError::IndexOutOfRange { index: 1, len: 1 }
        );
        assert_eq!(
            TableBuilder::new(1).set(0, ptr::null()).unwrap_err(),
            CapsuleError::NullPointer(0)
        );
    }

    #[test]
    fn test_init_from_generated_initializer() {
        let table = unsafe { TableBuilder::new(2).init_from(init_c_api_struct) }
            .finish()
            .unwrap();
        assert_eq!(table.get(0), Some(one as *const c_void));
        assert_eq!(table.get(1), Some(two as *const c_void));
    }

    #[test]
    fn test_empty_table() {
        let table = TableBuilder::new(0).finish().unwrap();
        assert!(table.is_empty());
        assert!(!table.as_ptr().is_null());
    }
}
