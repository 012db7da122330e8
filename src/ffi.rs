//! FFI interface for host interop
//!
//! Provides C-compatible functions for running extraction requests against a
//! page snapshot. All structured values cross the boundary as JSON.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use serde::Serialize;

use crate::message::handle_message;
use crate::model::FilterConfig;
use crate::orchestrator::extract_all_listings;
use crate::page::Page;

/// Result struct returned to the host
/// Both pointers are owned by Rust and must be freed via free_extraction_result
#[repr(C)]
pub struct ExtractionResultFFI {
    /// JSON-serialized result (null-terminated)
    pub json_ptr: *mut c_char,
    /// Error message if the call failed (null-terminated), or null on success
    pub error_ptr: *mut c_char,
}

/// Run a message-protocol request against an HTML snapshot.
///
/// # Arguments
/// * `html_ptr` - Pointer to HTML content (UTF-8, not necessarily null-terminated)
/// * `html_len` - Length of HTML content in bytes
/// * `page_url` - Address the page was loaded from (null-terminated), or null
/// * `request_json` - JSON request such as `{"action":"extractProductData"}` (null-terminated)
///
/// # Returns
/// ExtractionResultFFI with json_ptr holding the JSON response, or error_ptr
/// set when the arguments themselves are unusable
///
/// # Safety
/// - `html_ptr` must point to valid memory of at least `html_len` bytes
/// - `page_url` must be null or a valid null-terminated C string
/// - `request_json` must be a valid null-terminated C string
/// - Caller must free the result via `free_extraction_result`
#[no_mangle]
pub unsafe extern "C" fn handle_message_ffi(
    html_ptr: *const c_char,
    html_len: usize,
    page_url: *const c_char,
    request_json: *const c_char,
) -> ExtractionResultFFI {
    let html = match read_html(html_ptr, html_len) {
        Ok(html) => html,
        Err(msg) => return make_error_result(msg),
    };

    let url = match read_optional_str(page_url) {
        Ok(url) => url,
        Err(msg) => return make_error_result(msg),
    };

    let request_str = match read_optional_str(request_json) {
        Ok(Some(s)) => s,
        Ok(None) => return make_error_result("Request JSON is null"),
        Err(msg) => return make_error_result(msg),
    };

    let page = Page::parse(&html, url);
    match handle_message(&page, request_str) {
        Ok(response) => make_json_result(&response),
        Err(e) => make_error_result(&format!("Failed to parse request JSON: {}", e)),
    }
}

/// Extract and filter every listing on a results page (convenience function)
///
/// `filter_json` may be null for no filtering.
///
/// # Safety
/// Same as handle_message_ffi
#[no_mangle]
pub unsafe extern "C" fn extract_all_listings_ffi(
    html_ptr: *const c_char,
    html_len: usize,
    page_url: *const c_char,
    filter_json: *const c_char,
) -> ExtractionResultFFI {
    let html = match read_html(html_ptr, html_len) {
        Ok(html) => html,
        Err(msg) => return make_error_result(msg),
    };

    let url = match read_optional_str(page_url) {
        Ok(url) => url,
        Err(msg) => return make_error_result(msg),
    };

    let config = match read_optional_str(filter_json) {
        Ok(None) => FilterConfig::default(),
        Ok(Some(s)) => match serde_json::from_str::<FilterConfig>(s) {
            Ok(c) => c,
            Err(e) => return make_error_result(&format!("Failed to parse filter JSON: {}", e)),
        },
        Err(msg) => return make_error_result(msg),
    };

    let page = Page::parse(&html, url);
    make_json_result(&extract_all_listings(&page, &config))
}

/// Free an ExtractionResultFFI returned by one of the functions above
///
/// # Safety
/// - `result` must have been returned by this library
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn free_extraction_result(result: ExtractionResultFFI) {
    if !result.json_ptr.is_null() {
        drop(CString::from_raw(result.json_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

unsafe fn read_html(html_ptr: *const c_char, html_len: usize) -> Result<String, &'static str> {
    if html_ptr.is_null() || html_len == 0 {
        return Ok(String::new());
    }
    let slice = std::slice::from_raw_parts(html_ptr as *const u8, html_len);
    std::str::from_utf8(slice)
        .map(str::to_string)
        .map_err(|_| "Invalid UTF-8 in HTML content")
}

unsafe fn read_optional_str<'a>(ptr: *const c_char) -> Result<Option<&'a str>, &'static str> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(Some)
        .map_err(|_| "Invalid UTF-8 in argument")
}

fn make_json_result<T: Serialize>(value: &T) -> ExtractionResultFFI {
    match serde_json::to_string(value) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => ExtractionResultFFI {
                json_ptr: cstr.into_raw(),
                error_ptr: ptr::null_mut(),
            },
            Err(_) => make_error_result("Result JSON contains null bytes"),
        },
        Err(e) => make_error_result(&format!("Failed to serialize result: {}", e)),
    }
}

// Helper to create error result
fn make_error_result(msg: &str) -> ExtractionResultFFI {
    let error_cstr = CString::new(msg).unwrap_or_else(|_| c"Unknown error".to_owned());
    ExtractionResultFFI {
        json_ptr: ptr::null_mut(),
        error_ptr: error_cstr.into_raw(),
    }
}
