//! Error types for archive operations

use crate::config::ConfigError;
use std::ffi::CStr;
use thiserror::Error;

/// Broad classification of an [`Error`]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ErrorKind {
    /// Failure in the operating system I/O layer
    Io,
    /// Failure reported by (or on behalf of) libarchive
    LibArchive,
}

/// Errors that can occur while reading, writing or extracting archives
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// libarchive returned a failure status
    #[error("{message}")]
    LibArchive {
        /// Raw libarchive status code (`ARCHIVE_FAILED`, `ARCHIVE_FATAL`, ...)
        code: i32,
        /// `archive_errno` at the time of the failure
        errno: i32,
        /// `archive_error_string` at the time of the failure
        message: String,
    },

    /// Handle allocation failed
    #[error("archive allocation error: {what}")]
    Allocation {
        /// Which allocation failed
        what: &'static str,
    },

    /// Path cannot be handed to libarchive
    #[error("Invalid path (contains NUL byte): {path}")]
    InvalidPath {
        /// Offending path, lossily converted
        path: String,
    },

    /// Entry path would escape the extraction directory
    #[error("Refusing to extract unsafe path: {path}")]
    UnsafePath {
        /// Entry path as stored in the archive
        path: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io { .. } => ErrorKind::Io,
            _ => ErrorKind::LibArchive,
        }
    }

    /// Build an error from the current state of a libarchive handle.
    ///
    /// # Safety
    ///
    /// `archive` must be a live handle returned by `archive_read_new` or
    /// `archive_write_new`.
    pub(crate) unsafe fn from_archive(archive: *mut ffi::archive, code: i32) -> Error {
        let (errno, message) = unsafe {
            let errno = ffi::archive_errno(archive);
            let msg = ffi::archive_error_string(archive);
            let message = if msg.is_null() {
                format!("libarchive failed with status {}", code)
            } else {
                CStr::from_ptr(msg).to_string_lossy().into_owned()
            };
            (errno, message)
        };

        Error::LibArchive {
            code,
            errno,
            message,
        }
    }
}

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, Error>;
