//! Node inspection and mutation FFI functions.
#![allow(unsafe_code, clippy::missing_safety_doc)]

use std::os::raw::c_char;

use crate::{Document, Node, NodeId, TreeError};

use super::strings::to_c_string;
use super::{clear_last_error, document_mut, document_ref, set_last_error};

unsafe fn doc_and_node<'a>(doc: *const Document, raw_node: u64) -> Option<(&'a Document, Node)> {
    let doc = unsafe { document_ref(doc) }?;
    let id = NodeId::from_raw(raw_node)?;
    Some((doc, doc.node(id)?))
}

/// Returns the libxml2 `xmlElementType` code of a node, or 0 if the node
/// is unknown or released.
///
/// # Safety
///
/// `doc` must not be mutated concurrently.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_node_type(doc: *const Document, node: u64) -> i32 {
    clear_last_error();
    match unsafe { doc_and_node(doc, node) } {
        Some((_, node)) => node.node_type().code(),
        None => 0,
    }
}

/// Returns the name of an element, PI or doctype node, or null.
///
/// The returned string must be freed with
/// [`xmlsteward_free_string`](super::strings::xmlsteward_free_string).
///
/// # Safety
///
/// `doc` must not be mutated concurrently.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_node_name(doc: *const Document, node: u64) -> *mut c_char {
    clear_last_error();
    let Some((doc, node)) = (unsafe { doc_and_node(doc, node) }) else {
        return std::ptr::null_mut();
    };
    node.name(doc).map_or(std::ptr::null_mut(), to_c_string)
}

/// Returns the text content of a node, or null if the node is released.
///
/// The returned string must be freed with
/// [`xmlsteward_free_string`](super::strings::xmlsteward_free_string).
///
/// # Safety
///
/// `doc` must not be mutated concurrently.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_node_text(doc: *const Document, node: u64) -> *mut c_char {
    clear_last_error();
    let Some((doc, node)) = (unsafe { doc_and_node(doc, node) }) else {
        return std::ptr::null_mut();
    };
    node.text(doc)
        .map_or(std::ptr::null_mut(), |text| to_c_string(&text))
}

/// Appends `child` as the last child of `parent`.
///
/// Returns 0 on success, -1 on failure.
///
/// # Safety
///
/// No other reference to the document may be in use.
#[no_mangle]
pub unsafe extern "C" fn xmlsteward_append_child(doc: *mut Document, parent: u64, child: u64) -> i32 {
    clear_last_error();
    let Some(doc) = (unsafe { document_mut(doc) }) else {
        return -1;
    };
    let (Some(parent), Some(child)) = (NodeId::from_raw(parent), NodeId::from_raw(child)) else {
        set_last_error("null node handle");
        return -1;
    };
    let (parent, child) = match (doc.node(parent), doc.node(child)) {
        (Some(p), Some(c)) => (p, c),
        (None, _) => {
            set_last_error(&TreeError::StaleHandle(parent).to_string());
            return -1;
        }
        (_, None) => {
            set_last_error(&TreeError::StaleHandle(child).to_string());
            return -1;
        }
    };
    match doc.append_child(&parent, &child) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}
