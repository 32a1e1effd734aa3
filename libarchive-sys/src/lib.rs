//! # libarchive FFI
//!
//! Hand-maintained declarations for the subset of the libarchive 3.x C API
//! used by the `libarchive` crate. Everything here is `unsafe` to call; the
//! safe layer lives in the `libarchive` crate.
//!
//! Requires libarchive >= 3.2 (`archive_write_set_format_filter_by_ext`).

#![allow(non_camel_case_types)]
#![warn(clippy::all)]

use libc::{c_char, c_int, c_long, c_uint, c_void, mode_t, size_t, ssize_t, time_t};

/// Opaque read or write handle (`struct archive`).
#[repr(C)]
pub struct archive {
    _private: [u8; 0],
}

/// Opaque entry header (`struct archive_entry`).
#[repr(C)]
pub struct archive_entry {
    _private: [u8; 0],
}

/// `la_int64_t`
pub type la_int64_t = i64;
/// `la_ssize_t`
pub type la_ssize_t = ssize_t;

// Status codes returned by most functions.

/// Found end of archive.
pub const ARCHIVE_EOF: c_int = 1;
/// Operation was successful.
pub const ARCHIVE_OK: c_int = 0;
/// Retry might succeed.
pub const ARCHIVE_RETRY: c_int = -10;
/// Partial success.
pub const ARCHIVE_WARN: c_int = -20;
/// Current operation cannot complete, but the handle is still usable.
pub const ARCHIVE_FAILED: c_int = -25;
/// No more operations are possible on this handle.
pub const ARCHIVE_FATAL: c_int = -30;

// File type bits, identical to the POSIX S_IF* values.

/// Mask selecting the file type bits.
pub const AE_IFMT: mode_t = 0o170000;
/// Regular file.
pub const AE_IFREG: mode_t = 0o100000;
/// Symbolic link.
pub const AE_IFLNK: mode_t = 0o120000;
/// Socket.
pub const AE_IFSOCK: mode_t = 0o140000;
/// Character device.
pub const AE_IFCHR: mode_t = 0o020000;
/// Block device.
pub const AE_IFBLK: mode_t = 0o060000;
/// Directory.
pub const AE_IFDIR: mode_t = 0o040000;
/// Named pipe.
pub const AE_IFIFO: mode_t = 0o010000;

unsafe extern "C" {
    // Library information

    pub fn archive_version_number() -> c_int;
    pub fn archive_version_string() -> *const c_char;

    // Read handles

    pub fn archive_read_new() -> *mut archive;
    pub fn archive_read_support_filter_all(a: *mut archive) -> c_int;
    pub fn archive_read_support_format_all(a: *mut archive) -> c_int;
    pub fn archive_read_open_filename(
        a: *mut archive,
        filename: *const c_char,
        block_size: size_t,
    ) -> c_int;
    pub fn archive_read_open_memory(a: *mut archive, buff: *const c_void, size: size_t) -> c_int;
    pub fn archive_read_next_header(a: *mut archive, entry: *mut *mut archive_entry) -> c_int;
    pub fn archive_read_data(a: *mut archive, buff: *mut c_void, len: size_t) -> la_ssize_t;
    pub fn archive_read_data_skip(a: *mut archive) -> c_int;
    pub fn archive_read_close(a: *mut archive) -> c_int;
    pub fn archive_read_free(a: *mut archive) -> c_int;

    // Write handles

    pub fn archive_write_new() -> *mut archive;
    pub fn archive_write_set_format_filter_by_ext(
        a: *mut archive,
        filename: *const c_char,
    ) -> c_int;
    pub fn archive_write_set_format_by_name(a: *mut archive, name: *const c_char) -> c_int;
    pub fn archive_write_add_filter_by_name(a: *mut archive, name: *const c_char) -> c_int;
    pub fn archive_write_set_bytes_per_block(a: *mut archive, bytes_per_block: c_int) -> c_int;
    pub fn archive_write_open_filename(a: *mut archive, file: *const c_char) -> c_int;
    pub fn archive_write_header(a: *mut archive, entry: *mut archive_entry) -> c_int;
    pub fn archive_write_data(a: *mut archive, buff: *const c_void, len: size_t) -> la_ssize_t;
    pub fn archive_write_finish_entry(a: *mut archive) -> c_int;
    pub fn archive_write_close(a: *mut archive) -> c_int;
    pub fn archive_write_free(a: *mut archive) -> c_int;

    // Handle state

    pub fn archive_errno(a: *mut archive) -> c_int;
    pub fn archive_error_string(a: *mut archive) -> *const c_char;
    pub fn archive_format_name(a: *mut archive) -> *const c_char;
    pub fn archive_filter_count(a: *mut archive) -> c_int;
    pub fn archive_filter_name(a: *mut archive, n: c_int) -> *const c_char;
    pub fn archive_file_count(a: *mut archive) -> c_int;

    // Entries

    pub fn archive_entry_new() -> *mut archive_entry;
    pub fn archive_entry_free(entry: *mut archive_entry);
    pub fn archive_entry_clear(entry: *mut archive_entry) -> *mut archive_entry;

    pub fn archive_entry_pathname(entry: *mut archive_entry) -> *const c_char;
    pub fn archive_entry_set_pathname(entry: *mut archive_entry, name: *const c_char);

    pub fn archive_entry_size(entry: *mut archive_entry) -> la_int64_t;
    pub fn archive_entry_size_is_set(entry: *mut archive_entry) -> c_int;
    pub fn archive_entry_set_size(entry: *mut archive_entry, size: la_int64_t);

    pub fn archive_entry_filetype(entry: *mut archive_entry) -> mode_t;
    pub fn archive_entry_set_filetype(entry: *mut archive_entry, filetype: c_uint);

    pub fn archive_entry_perm(entry: *mut archive_entry) -> mode_t;
    pub fn archive_entry_set_perm(entry: *mut archive_entry, perm: mode_t);

    pub fn archive_entry_mtime(entry: *mut archive_entry) -> time_t;
    pub fn archive_entry_mtime_nsec(entry: *mut archive_entry) -> c_long;
    pub fn archive_entry_mtime_is_set(entry: *mut archive_entry) -> c_int;
    pub fn archive_entry_set_mtime(entry: *mut archive_entry, sec: time_t, nsec: c_long);

    pub fn archive_entry_symlink(entry: *mut archive_entry) -> *const c_char;
    pub fn archive_entry_set_symlink(entry: *mut archive_entry, target: *const c_char);
    pub fn archive_entry_hardlink(entry: *mut archive_entry) -> *const c_char;
    pub fn archive_entry_set_hardlink(entry: *mut archive_entry, target: *const c_char);

    pub fn archive_entry_uid(entry: *mut archive_entry) -> la_int64_t;
    pub fn archive_entry_set_uid(entry: *mut archive_entry, uid: la_int64_t);
    pub fn archive_entry_gid(entry: *mut archive_entry) -> la_int64_t;
    pub fn archive_entry_set_gid(entry: *mut archive_entry, gid: la_int64_t);
    pub fn archive_entry_uname(entry: *mut archive_entry) -> *const c_char;
    pub fn archive_entry_set_uname(entry: *mut archive_entry, name: *const c_char);
    pub fn archive_entry_gname(entry: *mut archive_entry) -> *const c_char;
    pub fn archive_entry_set_gname(entry: *mut archive_entry, name: *const c_char);
}
