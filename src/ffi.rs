//! FFI bindings for Scaffold Flux
//!
//! This module provides C-compatible functions so a browser shell or WebView
//! host can embed the telemetry core. All functions use C strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `quiz_free_string`.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::events::TimedEvent;
use crate::export::export_csv;
use crate::pipeline::{records_to_features, replay_to_json};
use crate::session::QuizSession;
use crate::types::{Question, Submission};

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

/// Return an allocated result string, or NULL with the last error set
fn into_c_result<E: std::fmt::Display>(result: Result<String, E>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Replay a captured event stream and return the session outcome as JSON.
///
/// # Safety
/// - `questions_json` (JSON array) and `events_ndjson` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `quiz_free_string`.
/// - Returns NULL on error; call `quiz_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn quiz_replay_session(
    questions_json: *const c_char,
    events_ndjson: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let questions = match cstr_to_string(questions_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid questions string pointer");
            return ptr::null_mut();
        }
    };

    let events = match cstr_to_string(events_ndjson) {
        Some(s) => s,
        None => {
            set_last_error("Invalid events string pointer");
            return ptr::null_mut();
        }
    };

    into_c_result(replay_to_json(&questions, &events))
}

/// Aggregate a captured log and return the session features as JSON.
///
/// # Safety
/// - `records_json` (JSON array of records) and `hinted_json` (JSON array of
///   question ids) must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `quiz_free_string`.
/// - Returns NULL on error; call `quiz_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn quiz_records_to_features(
    records_json: *const c_char,
    hinted_json: *const c_char,
    session_length: i32,
) -> *mut c_char {
    clear_last_error();

    let records = match cstr_to_string(records_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid records string pointer");
            return ptr::null_mut();
        }
    };

    let hinted: BTreeSet<u32> = match cstr_to_string(hinted_json)
        .map(|s| serde_json::from_str(&s))
    {
        Some(Ok(ids)) => ids,
        Some(Err(e)) => {
            set_last_error(&format!("Invalid hinted question ids: {e}"));
            return ptr::null_mut();
        }
        None => {
            set_last_error("Invalid hinted ids string pointer");
            return ptr::null_mut();
        }
    };

    if session_length < 0 {
        set_last_error("Session length must not be negative");
        return ptr::null_mut();
    }

    into_c_result(records_to_features(&records, &hinted, session_length as usize))
}

/// Render stored submissions (JSON array) as CSV text.
///
/// # Safety
/// - `submissions_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `quiz_free_string`.
/// - Returns NULL on error; call `quiz_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn quiz_export_csv(submissions_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json = match cstr_to_string(submissions_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid submissions string pointer");
            return ptr::null_mut();
        }
    };

    let submissions: Vec<Submission> = match serde_json::from_str(&json) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&format!("Invalid submissions JSON: {e}"));
            return ptr::null_mut();
        }
    };

    into_c_result(export_csv(&submissions))
}

// ============================================================================
// Live session API
// ============================================================================

/// Opaque handle to a live quiz session
pub struct QuizSessionHandle {
    session: QuizSession,
}

/// Start a live session over the given questions (JSON array), timed by the wall clock.
///
/// # Safety
/// - `questions_json` must be a valid null-terminated C string.
/// - Returns a handle that must be freed with `quiz_session_free`.
/// - Returns NULL on error; call `quiz_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn quiz_session_new(questions_json: *const c_char) -> *mut QuizSessionHandle {
    clear_last_error();

    let json = match cstr_to_string(questions_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid questions string pointer");
            return ptr::null_mut();
        }
    };

    let questions: Vec<Question> = match serde_json::from_str(&json) {
        Ok(q) => q,
        Err(e) => {
            set_last_error(&format!("Invalid questions JSON: {e}"));
            return ptr::null_mut();
        }
    };

    match QuizSession::new(questions, Arc::new(SystemClock)) {
        Ok(session) => Box::into_raw(Box::new(QuizSessionHandle { session })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a session handle.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `quiz_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn quiz_session_free(handle: *mut QuizSessionHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Apply one UI event (JSON object such as `{"event":"select","option":"A"}`).
///
/// Any timestamp on the event is ignored; the wall clock is used.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `quiz_session_new`.
/// - `event_json` must be a valid null-terminated C string.
/// - Returns 1 when this event completed the session, 0 on success otherwise,
///   and -1 on error (call `quiz_last_error` for details).
#[no_mangle]
pub unsafe extern "C" fn quiz_session_event(
    handle: *mut QuizSessionHandle,
    event_json: *const c_char,
) -> i32 {
    clear_last_error();

    let handle = match handle.as_mut() {
        Some(h) => h,
        None => {
            set_last_error("Invalid session handle");
            return -1;
        }
    };

    let json = match cstr_to_string(event_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid event string pointer");
            return -1;
        }
    };

    let timed: TimedEvent = match serde_json::from_str(&json) {
        Ok(e) => e,
        Err(e) => {
            set_last_error(&format!("Invalid event JSON: {e}"));
            return -1;
        }
    };

    match handle.session.handle(&timed.event) {
        Ok(_) if handle.session.is_complete() => 1,
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Get the sealed session features as JSON once the session is complete.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `quiz_session_new`.
/// - Returns a newly allocated string that must be freed with `quiz_free_string`.
/// - Returns NULL if the session is not complete or on error.
#[no_mangle]
pub unsafe extern "C" fn quiz_session_features(handle: *const QuizSessionHandle) -> *mut c_char {
    clear_last_error();

    let handle = match handle.as_ref() {
        Some(h) => h,
        None => {
            set_last_error("Invalid session handle");
            return ptr::null_mut();
        }
    };

    match handle.session.features() {
        Some(features) => into_c_result(serde_json::to_string(features)),
        None => {
            set_last_error("Session is not complete");
            ptr::null_mut()
        }
    }
}

/// Free a string returned by Scaffold Flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Scaffold Flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn quiz_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Scaffold Flux call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn quiz_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn quiz_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
