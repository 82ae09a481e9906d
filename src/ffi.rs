//! FFI bindings for Synheart Stress
//!
//! This module provides C-compatible functions for calling the classifier from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `stress_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::classifier::StressClassifier;
use crate::STRESS_VERSION;

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

// ============================================================================
// Stateless API
// ============================================================================

/// Load a model, classify one record, and return the report JSON.
///
/// Loads the model on every call; hosts classifying repeatedly should use
/// `stress_classifier_new` instead.
///
/// # Safety
/// - `model_json` and `record_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `stress_free_string`.
/// - Returns NULL on error; call `stress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stress_classify(
    model_json: *const c_char,
    record_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let model_str = match cstr_to_string(model_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid model JSON string pointer");
            return ptr::null_mut();
        }
    };

    let record_str = match cstr_to_string(record_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid record JSON string pointer");
            return ptr::null_mut();
        }
    };

    let result = StressClassifier::from_json(&model_str)
        .and_then(|classifier| classifier.classify_json(&record_str));

    match result {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Classifier API
// ============================================================================

/// Opaque handle to a StressClassifier
pub struct StressClassifierHandle {
    classifier: StressClassifier,
}

/// Load a model and create a classifier.
///
/// # Safety
/// - `model_json` must be a valid null-terminated C string.
/// - Returns a pointer that must be freed with `stress_classifier_free`.
/// - Returns NULL if the model fails to load; call `stress_last_error`.
#[no_mangle]
pub unsafe extern "C" fn stress_classifier_new(
    model_json: *const c_char,
) -> *mut StressClassifierHandle {
    clear_last_error();

    let model_str = match cstr_to_string(model_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid model JSON string pointer");
            return ptr::null_mut();
        }
    };

    match StressClassifier::from_json(&model_str) {
        Ok(classifier) => Box::into_raw(Box::new(StressClassifierHandle { classifier })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a classifier.
///
/// # Safety
/// - `classifier` must be a valid pointer returned by `stress_classifier_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn stress_classifier_free(classifier: *mut StressClassifierHandle) {
    if !classifier.is_null() {
        drop(Box::from_raw(classifier));
    }
}

/// Classify one record with a loaded classifier and return the report JSON.
///
/// # Safety
/// - `classifier` must be a valid pointer returned by `stress_classifier_new`.
/// - `record_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stress_free_string`.
/// - Returns NULL on error; call `stress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stress_classifier_classify(
    classifier: *const StressClassifierHandle,
    record_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if classifier.is_null() {
        set_last_error("Null classifier pointer");
        return ptr::null_mut();
    }

    let record_str = match cstr_to_string(record_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid record JSON string pointer");
            return ptr::null_mut();
        }
    };

    let handle = &*classifier;
    match handle.classifier.classify_json(&record_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Free a string returned by any `stress_*` function.
///
/// # Safety
/// - `s` must be a pointer returned by a `stress_*` function, or NULL.
#[no_mangle]
pub unsafe extern "C" fn stress_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the last error message, or NULL if none.
///
/// # Safety
/// - The returned pointer is valid until the next `stress_*` call on this thread.
/// - Do not free it.
#[no_mangle]
pub unsafe extern "C" fn stress_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `stress_free_string`.
#[no_mangle]
pub unsafe extern "C" fn stress_version() -> *mut c_char {
    string_to_cstr(STRESS_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model_json() -> CString {
        let artifact = json!({
            "ranges": {
                "minAge": 18.0, "maxAge": 60.0,
                "minPhone": 0.0, "maxPhone": 10.0,
                "minSocial": 0.0, "maxSocial": 10.0,
                "minProd": 0.0, "maxProd": 10.0,
                "minSleep": 0.0, "maxSleep": 10.0,
                "minApp": 0.0, "maxApp": 10.0,
                "minCaff": 0.0, "maxCaff": 10.0,
                "minScreen": 0.0, "maxScreen": 10.0
            },
            "genderMap": {"Male": 0},
            "occupationMap": {"IT": 0},
            "deviceMap": {"Android": 0},
            "trainSet": [[0.5, 0.0, 0.0, 0.0, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 1.0]]
        });
        CString::new(artifact.to_string()).unwrap()
    }

    fn record_json() -> CString {
        let record = json!({
            "age": 39, "gender": "Male", "occupation": "IT", "device": "Android",
            "dailyPhone": 5, "socialMedia": 5, "productivity": 5, "sleep": 5,
            "apps": 5, "caffeine": 5, "weekendScreen": 5
        });
        CString::new(record.to_string()).unwrap()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        stress_free_string(ptr);
        s
    }

    #[test]
    fn test_stateless_classify() {
        let model = model_json();
        let record = record_json();

        unsafe {
            let report = take_string(stress_classify(model.as_ptr(), record.as_ptr()));
            let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();
            assert_eq!(parsed["prediction"]["label"], 1);
            assert!(stress_last_error().is_null());
        }
    }

    #[test]
    fn test_stateful_classifier() {
        let model = model_json();
        let record = record_json();

        unsafe {
            let handle = stress_classifier_new(model.as_ptr());
            assert!(!handle.is_null());

            for _ in 0..2 {
                let report = take_string(stress_classifier_classify(handle, record.as_ptr()));
                assert!(report.contains("\"medium\""));
            }

            stress_classifier_free(handle);
        }
    }

    #[test]
    fn test_bad_model_sets_last_error() {
        let bad = CString::new("{}").unwrap();

        unsafe {
            let handle = stress_classifier_new(bad.as_ptr());
            assert!(handle.is_null());

            let err = CStr::from_ptr(stress_last_error()).to_str().unwrap();
            assert!(err.contains("Failed to load model"));
        }
    }

    #[test]
    fn test_invalid_record_sets_last_error() {
        let model = model_json();
        let record = CString::new(r#"{"age": "old"}"#).unwrap();

        unsafe {
            let result = stress_classify(model.as_ptr(), record.as_ptr());
            assert!(result.is_null());

            let err = CStr::from_ptr(stress_last_error()).to_str().unwrap();
            assert!(err.contains("Invalid input"));
        }
    }

    #[test]
    fn test_null_pointers() {
        unsafe {
            assert!(stress_classify(ptr::null(), ptr::null()).is_null());
            assert!(stress_classifier_classify(ptr::null(), ptr::null()).is_null());
            stress_classifier_free(ptr::null_mut());
            stress_free_string(ptr::null_mut());
        }
    }

    #[test]
    fn test_version() {
        unsafe {
            assert_eq!(take_string(stress_version()), STRESS_VERSION);
        }
    }
}
