//! Integration tests for the C FFI layer.
//!
//! These tests call the `extern "C"` functions directly from Rust.
#![cfg(feature = "ffi")]
#![allow(unsafe_code, clippy::unwrap_used)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use xmlsteward::ffi::document::*;
use xmlsteward::ffi::strings::*;
use xmlsteward::ffi::tree::*;
use xmlsteward::ffi::xmlsteward_last_error;
use xmlsteward::{Document, ParseOptions};

unsafe fn c_string_to_owned(ptr: *mut c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned();
    unsafe { xmlsteward_free_string(ptr) };
    Some(s)
}

fn last_error() -> Option<String> {
    let ptr = xmlsteward_last_error();
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned())
    }
}

fn parse(xml: &str, options: u32) -> *mut Document {
    let enc = CString::new("utf-8").unwrap();
    unsafe {
        xmlsteward_parse(
            xml.as_ptr(),
            xml.len(),
            enc.as_ptr(),
            std::ptr::null(),
            options,
            enc.as_ptr(),
        )
    }
}

#[test]
fn test_parse_root_and_free() {
    let doc = parse("<a><b/></a>", ParseOptions::default().bits());
    assert!(!doc.is_null());
    unsafe {
        let root = xmlsteward_doc_root(doc);
        assert_ne!(root, 0);
        assert_eq!(xmlsteward_node_type(doc, root), 1);
        assert_eq!(c_string_to_owned(xmlsteward_node_name(doc, root)).as_deref(), Some("a"));
        assert_eq!(xmlsteward_free_doc(doc), 0);
    }
}

#[test]
fn test_empty_content_has_no_root() {
    let doc = unsafe {
        xmlsteward_parse(std::ptr::null(), 0, std::ptr::null(), std::ptr::null(), 0, std::ptr::null())
    };
    assert!(!doc.is_null());
    unsafe {
        assert_eq!(xmlsteward_doc_root(doc), 0);
        xmlsteward_free_doc(doc);
    }
}

#[test]
fn test_parse_failure_sets_last_error() {
    let doc = parse("<a>", 0);
    assert!(doc.is_null());
    assert!(last_error().unwrap().contains("premature end"));
}

#[test]
fn test_double_free_rejected() {
    let doc = parse("<a/>", 0);
    unsafe {
        assert_eq!(xmlsteward_free_doc(doc), 0);
        assert_eq!(xmlsteward_free_doc(doc), -1);
        assert!(last_error().unwrap().contains("already freed"));
        assert_eq!(xmlsteward_doc_root(doc), 0);
        assert_eq!(xmlsteward_free_doc(std::ptr::null_mut()), -1);
    }
}

#[test]
fn test_fragment_lifecycle() {
    let doc = parse("<a/>", 0);
    let snippet = "<b/><c/>";
    unsafe {
        let index = xmlsteward_parse_fragment(doc, snippet.as_ptr(), snippet.len(), std::ptr::null(), 0);
        assert_eq!(index, 0);
        assert_eq!(xmlsteward_fragment_remove(doc, 0), 2);
        assert_eq!(xmlsteward_fragment_remove(doc, 0), 0);
        assert_eq!(xmlsteward_fragment_remove(doc, 7), 0);
        assert_eq!(xmlsteward_free_doc(doc), 2);
    }
}

#[test]
fn test_create_and_unlink() {
    let doc = parse("<a><b>text</b></a>", 0);
    let tag = CString::new("new").unwrap();
    let data = CString::new("<raw>").unwrap();
    unsafe {
        let root = xmlsteward_doc_root(doc);
        let element = xmlsteward_create_element(doc, tag.as_ptr());
        let cdata = xmlsteward_create_cdata(doc, data.as_ptr());
        assert_eq!(xmlsteward_node_type(doc, cdata), 4);
        assert_eq!(xmlsteward_append_child(doc, element, cdata), 0);
        assert_eq!(xmlsteward_append_child(doc, root, element), 0);
        assert_eq!(
            c_string_to_owned(xmlsteward_node_text(doc, root)).as_deref(),
            Some("text<raw>")
        );

        assert_eq!(xmlsteward_unlink_node(doc, element), 0);
        assert_eq!(xmlsteward_unlink_node(doc, 0), -1);
        assert_eq!(xmlsteward_add_unlinked_node(doc, 0), -1);
        assert_eq!(xmlsteward_free_doc(doc), 1);
    }
}

#[test]
fn test_stale_node_reads_nothing() {
    let doc = parse("<a><b/></a>", 0);
    let snippet = "<x/>";
    unsafe {
        xmlsteward_parse_fragment(doc, snippet.as_ptr(), snippet.len(), std::ptr::null(), 0);
        let root = xmlsteward_doc_root(doc);
        // a handle with a generation the arena never issued
        let forged = root + (7 << 32);
        assert_eq!(xmlsteward_node_type(doc, forged), 0);
        assert!(xmlsteward_node_name(doc, forged).is_null());
        assert_eq!(xmlsteward_unlink_node(doc, forged), -1);
        xmlsteward_free_doc(doc);
    }
}
