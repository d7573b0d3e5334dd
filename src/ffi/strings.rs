//! String helpers for the FFI layer.
#![allow(unsafe_code)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Converts a Rust `&str` to a caller-owned C string.
///
/// Returns null if the string contains interior null bytes.
pub(crate) fn to_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Reads an optional C string argument; null reads as empty.
///
/// # Safety
///
/// `ptr` must be null or a valid null-terminated string.
pub(crate) unsafe fn str_arg<'a>(ptr: *const c_char) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Ok("");
    }
    // SAFETY: non-null, and the caller guarantees null termination.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| format!("invalid UTF-8: {e}"))
}

/// Frees a string previously returned by an xmlsteward FFI function.
///
/// Passing null is safe and does nothing.
///
/// # Safety
///
/// The pointer must have been returned by an xmlsteward FFI function,
/// or be null.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        // SAFETY: `ptr` was created by `CString::into_raw` via `to_c_string`.
        unsafe {
            drop(CString::from_raw(ptr));
        }
    }
}
