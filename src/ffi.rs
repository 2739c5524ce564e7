//! FFI bindings for Writing Flux
//!
//! This module provides C-compatible functions for calling Flux from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `writing_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::writing::pipeline::{capture_to_features, record_to_features};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Extract features from a canonical writing record JSON.
///
/// # Safety
/// - `record_json` must be a valid null-terminated C string.
/// - Returns a newly allocated feature set JSON string that must be freed with `writing_free_string`.
/// - Returns NULL on error; call `writing_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn writing_extract_features(record_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(record_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid record string pointer");
            return ptr::null_mut();
        }
    };

    match record_to_features(json_str) {
        Ok(features) => string_to_cstr(&features),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Extract features from a capture log JSON plus the submitted article.
///
/// # Safety
/// - `capture_json` and `article` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `writing_free_string`.
/// - Returns NULL on error; call `writing_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn writing_extract_capture(
    capture_json: *const c_char,
    article: *const c_char,
    score: i64,
) -> *mut c_char {
    clear_last_error();

    let capture_str = match cstr_to_string(capture_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid capture log string pointer");
            return ptr::null_mut();
        }
    };

    let article_str = match cstr_to_string(article) {
        Some(s) => s,
        None => {
            set_last_error("Invalid article string pointer");
            return ptr::null_mut();
        }
    };

    match capture_to_features(&capture_str, &article_str, score) {
        Ok(features) => string_to_cstr(&features),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a string returned by Flux.
///
/// # Safety
/// - `ptr` must be a pointer returned by a Flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn writing_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Flux function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn writing_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Flux library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn writing_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
