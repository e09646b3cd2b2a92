//! C ABI exports
//!
//! # Memory ownership
//!
//! - Input pointers are borrowed for the duration of the call. They are
//!   copied, never retained or freed. A null input is read as `""`.
//! - Every returned pointer is a fresh NUL-terminated buffer allocated by
//!   this library and owned by the caller. It is never null. Release it
//!   exactly once with [`FreeString`], never with the host's `free`.
//! - Interior NUL bytes in error messages are dropped so the text fits a C
//!   string.
//!
//! # Panics
//!
//! Both exports run their body under `catch_boundary`. A panic never
//! unwinds into the host; the export returns `panic: <message>` instead.

#![allow(non_snake_case)]

use crate::doubler::double_bytes;
use crate::gcp::auth::AmbientCredentials;
use crate::probe::probe_blocking;
use std::any::Any;
use std::ffi::{c_char, CStr, CString};
use std::panic::{self, AssertUnwindSafe};

/// Returns `input` concatenated with itself.
///
/// # Safety
///
/// `input` must be null or point to a valid NUL-terminated string that stays
/// alive for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn StringDoubler(input: *const c_char) -> *mut c_char {
    // SAFETY: forwarded from the caller contract above.
    let bytes = unsafe { borrow_bytes(input) };
    into_c_string(catch_boundary("String doubler", || double_bytes(bytes)))
}

/// Resolves ambient credentials and builds a Compute Engine client for
/// `project_id` and `zone`. Returns `""` on success or the error message.
/// No instance is started.
///
/// # Safety
///
/// Both arguments must be null or point to valid NUL-terminated strings
/// that stay alive for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn ComputeClientProbe(
    project_id: *const c_char,
    zone: *const c_char,
) -> *mut c_char {
    // SAFETY: forwarded from the caller contract above.
    let (project_id, zone) = unsafe {
        (
            String::from_utf8_lossy(borrow_bytes(project_id)).into_owned(),
            String::from_utf8_lossy(borrow_bytes(zone)).into_owned(),
        )
    };

    into_c_string(catch_boundary("Compute client probe", || {
        probe_blocking(&AmbientCredentials, &project_id, &zone).into_bytes()
    }))
}

/// Releases a string returned by this library. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or a pointer returned by [`StringDoubler`] or
/// [`ComputeClientProbe`] that has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn FreeString(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: the pointer came from CString::into_raw in into_c_string.
    drop(unsafe { CString::from_raw(ptr) });
}

unsafe fn borrow_bytes<'a>(ptr: *const c_char) -> &'a [u8] {
    if ptr.is_null() {
        return &[];
    }
    unsafe { CStr::from_ptr(ptr) }.to_bytes()
}

fn into_c_string(bytes: Vec<u8>) -> *mut c_char {
    let c_string = CString::new(bytes).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|b| *b != 0);
        CString::new(bytes).unwrap_or_default()
    });
    c_string.into_raw()
}

/// Run an export body, turning a panic into `panic: <message>` bytes
fn catch_boundary(export: &str, body: impl FnOnce() -> Vec<u8>) -> Vec<u8> {
    panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!("{} panicked: {}", export, message);
        message.into_bytes()
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic: unknown cause".to_string()
    }
}
