//! Platform glue: path encoding, block sizes and owner lookups

use crate::error::{Error, Result};
use std::ffi::CString;
use std::fs::Metadata;
use std::path::Path;

/// Block size used when the file system gives no better hint
pub const DEFAULT_BLOCK_SIZE: usize = 65536;

/// Encode a path for libarchive.
///
/// Unix paths keep their raw bytes; other platforms go through a lossy
/// UTF-8 conversion.
pub fn path_to_cstring(path: &Path) -> Result<CString> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path.to_string_lossy().into_owned().into_bytes();

    CString::new(bytes).map_err(|_| Error::InvalidPath {
        path: path.to_string_lossy().into_owned(),
    })
}

/// Encode an in-archive name (pathname, link target, owner name)
pub fn str_to_cstring(value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::InvalidPath {
        path: value.to_string(),
    })
}

/// Preferred I/O size for a file, falling back to [`DEFAULT_BLOCK_SIZE`]
pub fn preferred_block_size(meta: &Metadata) -> usize {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        match usize::try_from(meta.blksize()) {
            Ok(0) | Err(_) => DEFAULT_BLOCK_SIZE,
            Ok(size) => size,
        }
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        DEFAULT_BLOCK_SIZE
    }
}

/// Resolve user and group names for numeric ids
#[cfg(unix)]
pub fn owner_names(uid: u32, gid: u32) -> (Option<String>, Option<String>) {
    use nix::unistd::{Gid, Group, Uid, User};

    let user = match User::from_uid(Uid::from_raw(uid)) {
        Ok(user) => user.map(|u| u.name),
        Err(e) => {
            tracing::debug!("uid {} lookup failed: {}", uid, e);
            None
        }
    };
    let group = match Group::from_gid(Gid::from_raw(gid)) {
        Ok(group) => group.map(|g| g.name),
        Err(e) => {
            tracing::debug!("gid {} lookup failed: {}", gid, e);
            None
        }
    };

    (user, group)
}

/// Resolve user and group names for numeric ids
#[cfg(not(unix))]
pub fn owner_names(_uid: u32, _gid: u32) -> (Option<String>, Option<String>) {
    (None, None)
}
