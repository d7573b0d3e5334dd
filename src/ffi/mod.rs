//! C FFI layer for xmlsteward.
//!
//! Exposes the document lifecycle to C and other hosts that speak the C
//! ABI. All symbols use the `xmlsteward_` prefix.
//!
//! # Error Handling
//!
//! Functions that can fail return null pointers, 0 (for node handles) or
//! -1 (for counts). The last error message is stored in thread-local
//! storage and can be retrieved via [`xmlsteward_last_error`].
//!
//! # Handles
//!
//! Documents are passed as opaque pointers. Every pointer handed out is
//! tracked until it is freed, so functions given an unknown or already
//! freed pointer fail cleanly instead of dereferencing it. Nodes are passed
//! as the packed `u64` form of [`NodeId`](crate::NodeId), 0 meaning no node.
//!
//! # String Ownership
//!
//! Strings returned by FFI functions are caller-owned and must be freed via
//! [`xmlsteward_free_string`](strings::xmlsteward_free_string).

#![allow(unsafe_code, clippy::missing_safety_doc)]

pub mod document;
pub mod strings;
pub mod tree;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::{Mutex, PoisonError};

use crate::Document;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

static LIVE_DOCUMENTS: Mutex<BTreeSet<usize>> = Mutex::new(BTreeSet::new());

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

/// Boxes `doc` and starts tracking the pointer.
fn register_document(doc: Document) -> *mut Document {
    let ptr = Box::into_raw(Box::new(doc));
    LIVE_DOCUMENTS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(ptr as usize);
    ptr
}

/// Stops tracking `ptr`. Returns `false` if it was not a live document.
fn unregister_document(ptr: *mut Document) -> bool {
    LIVE_DOCUMENTS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&(ptr as usize))
}

fn is_live_document(ptr: *const Document) -> bool {
    LIVE_DOCUMENTS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&(ptr as usize))
}

/// Borrows a tracked document, recording an error for unknown pointers.
///
/// # Safety
///
/// A tracked pointer must not be aliased mutably for the returned lifetime.
unsafe fn document_ref<'a>(ptr: *const Document) -> Option<&'a Document> {
    if !is_live_document(ptr) {
        set_last_error("not a live document");
        return None;
    }
    // SAFETY: tracked pointers come from `Box::into_raw` and stay valid until untracked.
    Some(unsafe { &*ptr })
}

/// Mutable counterpart of [`document_ref`].
///
/// # Safety
///
/// The caller must hold the only reference to the document.
unsafe fn document_mut<'a>(ptr: *mut Document) -> Option<&'a mut Document> {
    if !is_live_document(ptr) {
        set_last_error("not a live document");
        return None;
    }
    // SAFETY: tracked pointers come from `Box::into_raw` and stay valid until untracked.
    Some(unsafe { &mut *ptr })
}

/// Returns the last error message, or null if no error occurred.
///
/// The returned string is owned by the library and must NOT be freed
/// by the caller. It is valid until the next FFI call on the same thread.
#[no_mangle]
pub extern "C" fn xmlsteward_last_error() -> *const c_char {
    LAST_ERROR.with(|cell| {
        let borrow = cell.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => std::ptr::null(),
        }
    })
}
