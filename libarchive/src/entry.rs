//! Archive entry headers and entry data streams

use crate::error::{Error, Result};
use crate::handle::{Handle, string_from_ptr};
use crate::platform::str_to_cstring;
use libc::{c_int, c_long, c_uint, c_void, mode_t, time_t};
use std::io::{self, Read};
use std::ptr::NonNull;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Type of an archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Hard link to an earlier entry
    HardLink,
    /// Character device
    CharDevice,
    /// Block device
    BlockDevice,
    /// Named pipe
    Fifo,
    /// Socket
    Socket,
    /// File type bits libarchive reported but this crate does not model
    Unknown(u32),
}

impl EntryKind {
    /// Map libarchive file type bits
    pub fn from_mode(mode: u32) -> Self {
        match mode as mode_t & ffi::AE_IFMT {
            ffi::AE_IFREG => EntryKind::File,
            ffi::AE_IFDIR => EntryKind::Directory,
            ffi::AE_IFLNK => EntryKind::Symlink,
            ffi::AE_IFCHR => EntryKind::CharDevice,
            ffi::AE_IFBLK => EntryKind::BlockDevice,
            ffi::AE_IFIFO => EntryKind::Fifo,
            ffi::AE_IFSOCK => EntryKind::Socket,
            other => EntryKind::Unknown(other as u32),
        }
    }

    /// libarchive file type bits for this kind
    pub fn to_mode(self) -> u32 {
        let mode = match self {
            EntryKind::File | EntryKind::HardLink => ffi::AE_IFREG,
            EntryKind::Directory => ffi::AE_IFDIR,
            EntryKind::Symlink => ffi::AE_IFLNK,
            EntryKind::CharDevice => ffi::AE_IFCHR,
            EntryKind::BlockDevice => ffi::AE_IFBLK,
            EntryKind::Fifo => ffi::AE_IFIFO,
            EntryKind::Socket => ffi::AE_IFSOCK,
            EntryKind::Unknown(bits) => return bits,
        };
        mode as u32
    }

    /// Single-character tag in the style of `ls -l`
    pub fn tag(self) -> char {
        match self {
            EntryKind::File => '-',
            EntryKind::Directory => 'd',
            EntryKind::Symlink => 'l',
            EntryKind::HardLink => 'h',
            EntryKind::CharDevice => 'c',
            EntryKind::BlockDevice => 'b',
            EntryKind::Fifo => 'p',
            EntryKind::Socket => 's',
            EntryKind::Unknown(_) => '?',
        }
    }
}

/// Owned snapshot of an entry header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    path: String,
    kind: EntryKind,
    size: Option<u64>,
    perm: u32,
    mtime: Option<SystemTime>,
    link_target: Option<String>,
    uid: u64,
    gid: u64,
    uname: Option<String>,
    gname: Option<String>,
}

impl Entry {
    fn new(path: impl Into<String>, kind: EntryKind, perm: u32) -> Self {
        Self {
            path: path.into(),
            kind,
            size: None,
            perm,
            mtime: None,
            link_target: None,
            uid: 0,
            gid: 0,
            uname: None,
            gname: None,
        }
    }

    /// Regular file header carrying `size` bytes of data
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        let mut entry = Self::new(path, EntryKind::File, 0o644);
        entry.size = Some(size);
        entry
    }

    /// Directory header
    pub fn directory(path: impl Into<String>) -> Self {
        let mut entry = Self::new(path, EntryKind::Directory, 0o755);
        entry.size = Some(0);
        entry
    }

    /// Symbolic link header pointing at `target`
    pub fn symlink(path: impl Into<String>, target: impl Into<String>) -> Self {
        let mut entry = Self::new(path, EntryKind::Symlink, 0o777);
        entry.size = Some(0);
        entry.link_target = Some(target.into());
        entry
    }

    /// Hard link header pointing at an earlier entry
    pub fn hard_link(path: impl Into<String>, target: impl Into<String>) -> Self {
        let mut entry = Self::new(path, EntryKind::HardLink, 0o644);
        entry.size = Some(0);
        entry.link_target = Some(target.into());
        entry
    }

    /// Header describing a file system object
    pub fn from_metadata(path: impl Into<String>, meta: &std::fs::Metadata) -> Self {
        let file_type = meta.file_type();
        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::File
        };

        let mut entry = Self::new(path, kind, 0o644);
        entry.size = Some(if kind == EntryKind::File { meta.len() } else { 0 });
        entry.mtime = meta.modified().ok();

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            entry.perm = meta.mode() & 0o7777;
            entry.uid = u64::from(meta.uid());
            entry.gid = u64::from(meta.gid());
            let (uname, gname) = crate::platform::owner_names(meta.uid(), meta.gid());
            entry.uname = uname;
            entry.gname = gname;
        }
        #[cfg(not(unix))]
        {
            entry.perm = match kind {
                EntryKind::Directory => 0o755,
                _ if meta.permissions().readonly() => 0o444,
                _ => 0o644,
            };
        }

        entry
    }

    /// Replace the permission bits
    pub fn with_perm(mut self, perm: u32) -> Self {
        self.perm = perm & 0o7777;
        self
    }

    /// Replace the modification time
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Replace the symbolic or hard link target
    pub fn with_link_target(mut self, target: impl Into<String>) -> Self {
        self.link_target = Some(target.into());
        self
    }

    /// Replace numeric owner and group
    pub fn with_owner(mut self, uid: u64, gid: u64) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Replace symbolic owner and group names
    pub fn with_owner_names(mut self, uname: Option<String>, gname: Option<String>) -> Self {
        self.uname = uname;
        self.gname = gname;
        self
    }

    /// Path stored in the archive
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Entry type
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Data size, when the archive recorded one
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Permission bits (`0o7777` mask)
    pub fn perm(&self) -> u32 {
        self.perm
    }

    /// Modification time, when the archive recorded one
    pub fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    /// Target of a symbolic or hard link
    pub fn link_target(&self) -> Option<&str> {
        self.link_target.as_deref()
    }

    /// Numeric owner
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Numeric group
    pub fn gid(&self) -> u64 {
        self.gid
    }

    /// Owner name
    pub fn uname(&self) -> Option<&str> {
        self.uname.as_deref()
    }

    /// Group name
    pub fn gname(&self) -> Option<&str> {
        self.gname.as_deref()
    }

    /// Copy a header out of libarchive.
    ///
    /// # Safety
    ///
    /// `raw` must point to a live entry, e.g. the one filled in by the most
    /// recent `archive_read_next_header` call on a still-open handle.
    pub(crate) unsafe fn from_raw(raw: *mut ffi::archive_entry) -> Self {
        unsafe {
            let path = string_from_ptr(ffi::archive_entry_pathname(raw)).unwrap_or_default();
            let hardlink = string_from_ptr(ffi::archive_entry_hardlink(raw));
            let symlink = string_from_ptr(ffi::archive_entry_symlink(raw));

            let kind = if hardlink.is_some() {
                EntryKind::HardLink
            } else {
                EntryKind::from_mode(ffi::archive_entry_filetype(raw) as u32)
            };

            let size = if ffi::archive_entry_size_is_set(raw) != 0 {
                u64::try_from(ffi::archive_entry_size(raw)).ok()
            } else {
                None
            };

            let mtime = if ffi::archive_entry_mtime_is_set(raw) != 0 {
                system_time_from_parts(
                    ffi::archive_entry_mtime(raw) as i64,
                    ffi::archive_entry_mtime_nsec(raw) as i64,
                )
            } else {
                None
            };

            Self {
                path,
                kind,
                size,
                perm: ffi::archive_entry_perm(raw) as u32 & 0o7777,
                mtime,
                link_target: hardlink.or(symlink),
                uid: u64::try_from(ffi::archive_entry_uid(raw)).unwrap_or(0),
                gid: u64::try_from(ffi::archive_entry_gid(raw)).unwrap_or(0),
                uname: string_from_ptr(ffi::archive_entry_uname(raw)),
                gname: string_from_ptr(ffi::archive_entry_gname(raw)),
            }
        }
    }

    /// Build a libarchive entry for writing
    pub(crate) fn to_raw(&self) -> Result<RawEntry> {
        let raw = RawEntry::new()?;
        let ptr = raw.as_ptr();

        let path = str_to_cstring(&self.path)?;
        unsafe {
            ffi::archive_entry_set_pathname(ptr, path.as_ptr());
            ffi::archive_entry_set_filetype(ptr, self.kind.to_mode() as c_uint);
            ffi::archive_entry_set_perm(ptr, self.perm as mode_t);
            ffi::archive_entry_set_uid(ptr, i64::try_from(self.uid).unwrap_or(0));
            ffi::archive_entry_set_gid(ptr, i64::try_from(self.gid).unwrap_or(0));
        }

        let size = match self.kind {
            EntryKind::File => self.size.unwrap_or(0),
            _ => 0,
        };
        let size = i64::try_from(size).map_err(|_| Error::Io {
            source: io::Error::new(io::ErrorKind::InvalidInput, "entry size overflows i64"),
        })?;
        unsafe { ffi::archive_entry_set_size(ptr, size) };

        if let Some(mtime) = self.mtime {
            let (secs, nanos) = secs_from_system_time(mtime);
            unsafe { ffi::archive_entry_set_mtime(ptr, secs as time_t, nanos as c_long) };
        }

        if let Some(target) = &self.link_target {
            let target = str_to_cstring(target)?;
            match self.kind {
                EntryKind::Symlink => unsafe {
                    ffi::archive_entry_set_symlink(ptr, target.as_ptr())
                },
                EntryKind::HardLink => unsafe {
                    ffi::archive_entry_set_hardlink(ptr, target.as_ptr())
                },
                _ => {}
            }
        }

        if let Some(uname) = &self.uname {
            let uname = str_to_cstring(uname)?;
            unsafe { ffi::archive_entry_set_uname(ptr, uname.as_ptr()) };
        }
        if let Some(gname) = &self.gname {
            let gname = str_to_cstring(gname)?;
            unsafe { ffi::archive_entry_set_gname(ptr, gname.as_ptr()) };
        }

        Ok(raw)
    }
}

/// Owned `struct archive_entry *` used while writing
pub(crate) struct RawEntry {
    raw: NonNull<ffi::archive_entry>,
}

impl RawEntry {
    fn new() -> Result<Self> {
        let raw = unsafe { ffi::archive_entry_new() };
        let raw = NonNull::new(raw).ok_or(Error::Allocation { what: "entry" })?;
        Ok(Self { raw })
    }

    pub(crate) fn as_ptr(&self) -> *mut ffi::archive_entry {
        self.raw.as_ptr()
    }
}

impl Drop for RawEntry {
    fn drop(&mut self) {
        unsafe { ffi::archive_entry_free(self.as_ptr()) };
    }
}

fn system_time_from_parts(secs: i64, nanos: i64) -> Option<SystemTime> {
    let base = if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(secs as u64))
    } else {
        UNIX_EPOCH.checked_sub(Duration::from_secs(secs.unsigned_abs()))
    }?;
    match u32::try_from(nanos) {
        Ok(nanos) if nanos < 1_000_000_000 => base.checked_add(Duration::from_nanos(u64::from(nanos))),
        _ => Some(base),
    }
}

fn secs_from_system_time(time: SystemTime) -> (i64, u32) {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => (after.as_secs() as i64, after.subsec_nanos()),
        // Pre-epoch times lose sub-second precision
        Err(before) => (-(before.duration().as_secs() as i64), 0),
    }
}

/// Current entry of an [`ArchiveReader`](crate::ArchiveReader) with access to its data
pub struct EntryReader<'a> {
    handle: &'a mut Handle,
    entry: Entry,
}

impl<'a> EntryReader<'a> {
    pub(crate) fn new(handle: &'a mut Handle, entry: Entry) -> Self {
        Self { handle, entry }
    }

    /// Header of the current entry
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Take the header, discarding the remaining data
    pub fn into_entry(self) -> Entry {
        self.entry
    }

    /// Discard the remaining data of this entry
    pub fn skip(self) -> Result<Entry> {
        let code = unsafe { ffi::archive_read_data_skip(self.handle.as_ptr()) };
        self.handle.check(code)?;
        Ok(self.entry)
    }
}

impl Read for EntryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let n = unsafe {
            ffi::archive_read_data(self.handle.as_ptr(), buf.as_mut_ptr() as *mut c_void, buf.len())
        };

        if n >= 0 {
            Ok(n as usize)
        } else {
            Err(io::Error::other(self.handle.error(n as c_int)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_mode() {
        assert_eq!(EntryKind::from_mode(0o100644), EntryKind::File);
        assert_eq!(EntryKind::from_mode(0o040755), EntryKind::Directory);
        assert_eq!(EntryKind::from_mode(0o120777), EntryKind::Symlink);
        assert_eq!(EntryKind::from_mode(0o010644), EntryKind::Fifo);
        assert_eq!(EntryKind::from_mode(0), EntryKind::Unknown(0));
    }

    #[test]
    fn test_kind_mode_mapping() {
        for kind in [
            EntryKind::File,
            EntryKind::Directory,
            EntryKind::Symlink,
            EntryKind::CharDevice,
            EntryKind::BlockDevice,
            EntryKind::Fifo,
            EntryKind::Socket,
        ] {
            assert_eq!(EntryKind::from_mode(kind.to_mode()), kind);
        }
        // Hard links are regular files with a link target
        assert_eq!(EntryKind::HardLink.to_mode(), EntryKind::File.to_mode());
    }

    #[test]
    fn test_builders() {
        let file = Entry::file("src/foo", 4).with_perm(0o100600);
        assert_eq!(file.kind(), EntryKind::File);
        assert_eq!(file.size(), Some(4));
        assert_eq!(file.perm(), 0o600);

        let dir = Entry::directory("src/");
        assert_eq!(dir.kind(), EntryKind::Directory);
        assert_eq!(dir.perm(), 0o755);

        let link = Entry::symlink("latest", "src/foo");
        assert_eq!(link.link_target(), Some("src/foo"));
    }

    #[test]
    fn test_raw_entry_carries_header() {
        let mtime = UNIX_EPOCH + Duration::new(1_600_000_000, 123_456_789);
        let entry = Entry::file("src/foo", 4)
            .with_perm(0o640)
            .with_mtime(mtime)
            .with_owner(1000, 100)
            .with_owner_names(Some("alice".to_string()), Some("users".to_string()));

        let raw = entry.to_raw().unwrap();
        let copy = unsafe { Entry::from_raw(raw.as_ptr()) };

        assert_eq!(copy, entry);
    }

    #[test]
    fn test_raw_symlink_keeps_target() {
        let entry = Entry::symlink("latest", "src/foo");
        let raw = entry.to_raw().unwrap();
        let copy = unsafe { Entry::from_raw(raw.as_ptr()) };

        assert_eq!(copy.kind(), EntryKind::Symlink);
        assert_eq!(copy.link_target(), Some("src/foo"));
        assert!(copy.mtime().is_none());
    }

    #[test]
    fn test_pre_epoch_times() {
        let time = system_time_from_parts(-86_400, 0).unwrap();
        assert_eq!(secs_from_system_time(time), (-86_400, 0));
    }

    #[test]
    fn test_path_with_nul_cannot_be_written() {
        let entry = Entry::file("bad\0name", 0);
        assert!(matches!(entry.to_raw(), Err(Error::InvalidPath { .. })));
    }
}
