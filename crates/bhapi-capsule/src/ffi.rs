//! C ABI over the registry
//!
//! `bh_capsule_import` has the shape the generated import routine expects
//! from its lookup function, so a header generated with
//! `lookup_function = "bh_capsule_import"` resolves through this registry.

use crate::registry::{acquire, publish};
use crate::table::TableBuilder;
use crate::CapsuleError;
use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;
use tracing::warn;

unsafe fn key_from_ptr<'a>(key: *const c_char) -> Result<&'a str, CapsuleError> {
    if key.is_null() {
        return Err(CapsuleError::EmptyKey);
    }
    CStr::from_ptr(key).to_str().map_err(|_| CapsuleError::InvalidKey)
}

/// Publish `len` function addresses starting at `table` under `key`
///
/// Returns 0 on success and -1 on error. The addresses are copied; `table`
/// can be freed afterwards.
///
/// # Safety
///
/// `key` must be null or a NUL-terminated string, and `table` must be null
/// or point to `len` readable pointers.
#[no_mangle]
pub unsafe extern "C" fn bh_capsule_publish(
    key: *const c_char,
    table: *const *const c_void,
    len: usize,
) -> c_int {
    let result = key_from_ptr(key).and_then(|key| {
        let slots: &[*const c_void] = if len == 0 {
            &[]
        } else if table.is_null() {
            return Err(CapsuleError::NullPointer(0));
        } else {
            slice::from_raw_parts(table, len)
        };

        let mut builder = TableBuilder::new(len);
        for (index, &function) in slots.iter().enumerate() {
            builder = builder.set(index, function)?;
        }
        publish(key, builder.finish()?)
    });

    match result {
        Ok(_) => 0,
        Err(e) => {
            warn!(error = %e, "bh_capsule_publish failed");
            -1
        }
    }
}

/// Return the table published under `key`, or NULL
///
/// `no_block` is accepted for signature compatibility and ignored; the
/// lookup never blocks.
///
/// # Safety
///
/// `key` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bh_capsule_import(key: *const c_char, _no_block: c_int) -> *mut c_void {
    match key_from_ptr(key).and_then(acquire) {
        Ok(table) => table.as_ptr() as *mut c_void,
        Err(e) => {
            warn!(error = %e, "bh_capsule_import failed");
            ptr::null_mut()
        }
    }
}
