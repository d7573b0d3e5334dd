//! Document lifecycle FFI functions.
#![allow(unsafe_code, clippy::missing_safety_doc)]

use std::os::raw::c_char;

use crate::document::FragmentId;
use crate::{Document, NodeId, ParseOptions, TreeError};

use super::strings::str_arg;
use super::{
    clear_last_error, document_mut, document_ref, register_document, set_last_error,
    unregister_document,
};

/// Reads a byte buffer argument; a zero length accepts a null pointer.
unsafe fn bytes_arg<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        set_last_error("null data pointer");
        return None;
    }
    // SAFETY: non-null, and the caller guarantees `len` readable bytes.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

fn raw_node(id: Option<NodeId>) -> u64 {
    id.map_or(0, NodeId::into_raw)
}

/// Parses `len` bytes at `data` into a new document.
///
/// `options` takes the libxml2 `xmlParserOption` bit values; unknown bits
/// are ignored. Null encoding labels and URL read as empty, meaning UTF-8
/// and no URL.
///
/// Returns null on failure; see
/// [`xmlsteward_last_error`](super::xmlsteward_last_error). The document
/// must be released with [`xmlsteward_free_doc`].
///
/// # Safety
///
/// `data` must point to `len` readable bytes; string arguments must be null
/// or null-terminated.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_parse(
    data: *const u8,
    len: usize,
    input_encoding: *const c_char,
    url: *const c_char,
    options: u32,
    output_encoding: *const c_char,
) -> *mut Document {
    clear_last_error();
    let Some(bytes) = (unsafe { bytes_arg(data, len) }) else {
        return std::ptr::null_mut();
    };
    let args = unsafe { (str_arg(input_encoding), str_arg(url), str_arg(output_encoding)) };
    let (input_encoding, url, output_encoding) = match args {
        (Ok(i), Ok(u), Ok(o)) => (i, u, o),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            set_last_error(&e);
            return std::ptr::null_mut();
        }
    };
    let options = ParseOptions::from_bits_truncate(options);
    match Document::create(bytes, input_encoding, url, options, output_encoding) {
        Ok(doc) => register_document(doc),
        Err(e) => {
            set_last_error(&e.to_string());
            std::ptr::null_mut()
        }
    }
}

/// Frees a document and everything it owns.
///
/// Returns the number of unlinked nodes released during teardown, or -1 if
/// `doc` is null, unknown or already freed. A second free of the same
/// pointer is rejected this way instead of corrupting memory.
///
/// # Safety
///
/// No other reference to the document may be in use.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_free_doc(doc: *mut Document) -> i64 {
    clear_last_error();
    if !unregister_document(doc) {
        set_last_error("document already freed or never allocated");
        return -1;
    }
    // SAFETY: the pointer was tracked, so it came from `Box::into_raw` and
    // untracking it makes this the only release.
    let doc = *unsafe { Box::from_raw(doc) };
    let report = doc.free();
    i64::try_from(report.freed_nodes.len()).unwrap_or(i64::MAX)
}

/// Returns the root element handle, or 0 if the document has none.
///
/// # Safety
///
/// `doc` must not be mutated concurrently.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_doc_root(doc: *const Document) -> u64 {
    clear_last_error();
    match unsafe { document_ref(doc) } {
        Some(doc) => raw_node(doc.root().id()),
        None => 0,
    }
}

/// Creates an unattached element. Returns 0 on failure.
///
/// # Safety
///
/// `tag` must be null or null-terminated; no other reference to the
/// document may be in use.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_create_element(doc: *mut Document, tag: *const c_char) -> u64 {
    clear_last_error();
    let Some(doc) = (unsafe { document_mut(doc) }) else {
        return 0;
    };
    let tag = match unsafe { str_arg(tag) } {
        Ok(tag) => tag,
        Err(e) => {
            set_last_error(&e);
            return 0;
        }
    };
    match doc.create_element(tag) {
        Ok(node) => raw_node(node.id()),
        Err(e) => {
            set_last_error(&e.to_string());
            0
        }
    }
}

/// Creates an unattached CDATA section. Returns 0 on failure.
///
/// # Safety
///
/// `text` must be null or null-terminated; no other reference to the
/// document may be in use.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_create_cdata(doc: *mut Document, text: *const c_char) -> u64 {
    clear_last_error();
    let Some(doc) = (unsafe { document_mut(doc) }) else {
        return 0;
    };
    let text = match unsafe { str_arg(text) } {
        Ok(text) => text,
        Err(e) => {
            set_last_error(&e);
            return 0;
        }
    };
    match doc.create_cdata(text) {
        Some(node) => raw_node(node.id()),
        None => {
            set_last_error("node limit reached");
            0
        }
    }
}

/// Parses a fragment into the document and bookkeeps it.
///
/// Returns the fragment index, or -1 on failure.
///
/// # Safety
///
/// `data` must point to `len` readable bytes; `url` must be null or
/// null-terminated; no other reference to the document may be in use.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_parse_fragment(
    doc: *mut Document,
    data: *const u8,
    len: usize,
    url: *const c_char,
    options: u32,
) -> i64 {
    clear_last_error();
    let Some(doc) = (unsafe { document_mut(doc) }) else {
        return -1;
    };
    let Some(bytes) = (unsafe { bytes_arg(data, len) }) else {
        return -1;
    };
    let url = match unsafe { str_arg(url) } {
        Ok(url) => url,
        Err(e) => {
            set_last_error(&e);
            return -1;
        }
    };
    match doc.parse_fragment(bytes, url, ParseOptions::from_bits_truncate(options)) {
        Ok(id) => i64::try_from(id.index()).unwrap_or(-1),
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Removes a fragment now, moving its nodes to the unlinked registry.
///
/// Returns the number of nodes migrated (0 for an already removed or
/// unknown fragment), or -1 for an invalid document.
///
/// # Safety
///
/// No other reference to the document may be in use.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_fragment_remove(doc: *mut Document, index: usize) -> i64 {
    clear_last_error();
    let Some(doc) = (unsafe { document_mut(doc) }) else {
        return -1;
    };
    let id = FragmentId {
        doc: doc.id(),
        index,
    };
    i64::try_from(doc.remove_fragment(id)).unwrap_or(i64::MAX)
}

/// Registers a node handle for release at teardown, without validation.
///
/// Returns 0 on success, -1 for an invalid document or a zero handle.
///
/// # Safety
///
/// No other reference to the document may be in use.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_add_unlinked_node(doc: *mut Document, node: u64) -> i32 {
    clear_last_error();
    let Some(doc) = (unsafe { document_mut(doc) }) else {
        return -1;
    };
    let Some(id) = NodeId::from_raw(node) else {
        set_last_error("null node handle");
        return -1;
    };
    doc.add_unlinked_node(id);
    0
}

/// Detaches a node from its parent and registers it.
///
/// Returns 0 on success, -1 on failure.
///
/// # Safety
///
/// No other reference to the document may be in use.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_unlink_node(doc: *mut Document, node: u64) -> i32 {
    clear_last_error();
    let Some(doc) = (unsafe { document_mut(doc) }) else {
        return -1;
    };
    let Some(id) = NodeId::from_raw(node) else {
        set_last_error("null node handle");
        return -1;
    };
    let Some(node) = doc.node(id) else {
        set_last_error(&TreeError::StaleHandle(id).to_string());
        return -1;
    };
    match doc.unlink(&node) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}
