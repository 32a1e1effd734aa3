//! Owned libarchive handle

use crate::error::{Error, Result};
use libc::{c_char, c_int};
use std::ffi::CStr;
use std::ptr::NonNull;

/// Direction a handle was created for; selects the matching close/free calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Read,
    Write,
}

/// Owned `struct archive *`, freed exactly once on drop
pub(crate) struct Handle {
    raw: NonNull<ffi::archive>,
    mode: Mode,
    closed: bool,
}

// A handle may move between threads but must never be shared.
unsafe impl Send for Handle {}

impl Handle {
    /// Allocate a read handle
    pub(crate) fn new_read() -> Result<Self> {
        let raw = unsafe { ffi::archive_read_new() };
        Self::wrap(raw, Mode::Read)
    }

    /// Allocate a write handle
    pub(crate) fn new_write() -> Result<Self> {
        let raw = unsafe { ffi::archive_write_new() };
        Self::wrap(raw, Mode::Write)
    }

    fn wrap(raw: *mut ffi::archive, mode: Mode) -> Result<Self> {
        let raw = NonNull::new(raw).ok_or(Error::Allocation {
            what: match mode {
                Mode::Read => "read handle",
                Mode::Write => "write handle",
            },
        })?;

        Ok(Self {
            raw,
            mode,
            closed: false,
        })
    }

    pub(crate) fn as_ptr(&self) -> *mut ffi::archive {
        self.raw.as_ptr()
    }

    /// Map a libarchive status code onto `Result`.
    ///
    /// `ARCHIVE_OK` and `ARCHIVE_EOF` pass through, `ARCHIVE_WARN` is logged
    /// and passes through, anything lower becomes an error.
    pub(crate) fn check(&self, code: c_int) -> Result<c_int> {
        match code {
            ffi::ARCHIVE_OK | ffi::ARCHIVE_EOF => Ok(code),
            ffi::ARCHIVE_WARN => {
                tracing::warn!("libarchive: {}", self.error_message());
                Ok(code)
            }
            _ => Err(self.error(code)),
        }
    }

    /// Build an error from the handle's current error state
    pub(crate) fn error(&self, code: c_int) -> Error {
        unsafe { Error::from_archive(self.as_ptr(), code) }
    }

    pub(crate) fn error_message(&self) -> String {
        unsafe { string_from_ptr(ffi::archive_error_string(self.as_ptr())) }
            .unwrap_or_else(|| "unknown libarchive error".to_string())
    }

    /// Name of the detected (read) or selected (write) format
    pub(crate) fn format_name(&self) -> Option<String> {
        unsafe { string_from_ptr(ffi::archive_format_name(self.as_ptr())) }
    }

    /// Names of the active filters, outermost first, without the trailing "none"
    pub(crate) fn filter_names(&self) -> Vec<String> {
        let count = unsafe { ffi::archive_filter_count(self.as_ptr()) };
        (0..count)
            .filter_map(|n| unsafe { string_from_ptr(ffi::archive_filter_name(self.as_ptr(), n)) })
            .filter(|name| name != "none")
            .collect()
    }

    /// Close the handle, flushing pending output for writers
    pub(crate) fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let code = unsafe {
            match self.mode {
                Mode::Read => ffi::archive_read_close(self.as_ptr()),
                Mode::Write => ffi::archive_write_close(self.as_ptr()),
            }
        };
        self.check(code).map(|_| ())
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("Failed to close archive: {}", e);
        }

        unsafe {
            match self.mode {
                Mode::Read => ffi::archive_read_free(self.as_ptr()),
                Mode::Write => ffi::archive_write_free(self.as_ptr()),
            };
        }
    }
}

/// Copy a possibly-NULL C string owned by libarchive
pub(crate) unsafe fn string_from_ptr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}
