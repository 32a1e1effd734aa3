//! Streaming archive reader

use crate::config::ReadOptions;
use crate::entry::{Entry, EntryReader};
use crate::error::Result;
use crate::extract::{self, ExtractOptions};
use crate::handle::Handle;
use crate::platform::{DEFAULT_BLOCK_SIZE, path_to_cstring, preferred_block_size};
use libc::{c_char, c_void};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Reader over any format and compression libarchive understands
pub struct ArchiveReader {
    // Declared before `buffer`: the handle must be freed before its input.
    handle: Handle,
    buffer: Option<Box<[u8]>>,
    block_size: usize,
}

impl ArchiveReader {
    /// Block size used for stdin, in-memory input and as the fallback
    pub const DEFAULT_BLOCK_SIZE: usize = DEFAULT_BLOCK_SIZE;

    /// Open an archive file, reading in the file system's preferred block size
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &ReadOptions::default())
    }

    /// Open an archive file with explicit options
    pub fn open_with<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = path_to_cstring(path)?;

        let block_size = match options.block_size {
            Some(size) => size,
            None => preferred_block_size(&fs::metadata(path)?),
        };

        info!("Opening archive {} (block size {})", path.display(), block_size);
        Self::open_filename(file.as_ptr(), block_size)
    }

    /// Read an archive from standard input
    pub fn stdin() -> Result<Self> {
        debug!("Opening archive from stdin");
        Self::open_filename(std::ptr::null(), Self::DEFAULT_BLOCK_SIZE)
    }

    /// Read an archive held in memory
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let buffer = bytes.into().into_boxed_slice();
        let handle = Self::new_handle()?;

        let code = unsafe {
            ffi::archive_read_open_memory(
                handle.as_ptr(),
                buffer.as_ptr() as *const c_void,
                buffer.len(),
            )
        };
        handle.check(code)?;

        debug!("Opened in-memory archive ({} bytes)", buffer.len());
        Ok(Self {
            handle,
            buffer: Some(buffer),
            block_size: Self::DEFAULT_BLOCK_SIZE,
        })
    }

    fn new_handle() -> Result<Handle> {
        let handle = Handle::new_read()?;
        unsafe {
            handle.check(ffi::archive_read_support_filter_all(handle.as_ptr()))?;
            handle.check(ffi::archive_read_support_format_all(handle.as_ptr()))?;
        }
        Ok(handle)
    }

    fn open_filename(path: *const c_char, block_size: usize) -> Result<Self> {
        let handle = Self::new_handle()?;

        let code = unsafe { ffi::archive_read_open_filename(handle.as_ptr(), path, block_size) };
        handle.check(code)?;

        Ok(Self {
            handle,
            buffer: None,
            block_size,
        })
    }

    /// Block size handed to libarchive
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Detected archive format; known once the first header has been read
    pub fn format_name(&self) -> Option<String> {
        self.handle.format_name()
    }

    /// Detected compression filters, outermost first
    pub fn filter_names(&self) -> Vec<String> {
        self.handle.filter_names()
    }

    /// Whether the input is held in memory
    pub fn is_in_memory(&self) -> bool {
        self.buffer.is_some()
    }

    /// Advance to the next entry.
    ///
    /// Any unread data of the previous entry is skipped. Returns `None` at the
    /// end of the archive.
    pub fn next_entry(&mut self) -> Result<Option<EntryReader<'_>>> {
        match self.read_header()? {
            Some(entry) => Ok(Some(EntryReader::new(&mut self.handle, entry))),
            None => Ok(None),
        }
    }

    fn read_header(&mut self) -> Result<Option<Entry>> {
        let mut raw: *mut ffi::archive_entry = std::ptr::null_mut();
        let code = unsafe { ffi::archive_read_next_header(self.handle.as_ptr(), &mut raw) };

        if self.handle.check(code)? == ffi::ARCHIVE_EOF {
            return Ok(None);
        }

        let entry = unsafe { Entry::from_raw(raw) };
        debug!("Read header {} ({:?})", entry.path(), entry.kind());
        Ok(Some(entry))
    }

    /// Iterate over entry headers, skipping entry data
    pub fn entries(self) -> Entries {
        Entries::new(self)
    }

    /// Extract every entry below `dir`, returning the number materialised
    pub fn unpack<P: AsRef<Path>>(&mut self, dir: P, options: &ExtractOptions) -> Result<usize> {
        extract::unpack(self, dir.as_ref(), options)
    }
}

impl IntoIterator for ArchiveReader {
    type Item = Result<Entry>;
    type IntoIter = Entries;

    fn into_iter(self) -> Entries {
        self.entries()
    }
}

/// Owning iterator over the entry headers of an archive.
///
/// Fused after the end of the archive or after an `ARCHIVE_FATAL` error;
/// recoverable errors are yielded and iteration continues.
pub struct Entries {
    reader: ArchiveReader,
    done: bool,
}

impl Entries {
    fn new(reader: ArchiveReader) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    /// Underlying reader
    pub fn reader(&self) -> &ArchiveReader {
        &self.reader
    }
}

impl Iterator for Entries {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Result<Entry>> {
        if self.done {
            return None;
        }

        match self.reader.read_header() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                if let crate::Error::LibArchive { code, .. } = &e {
                    self.done = *code == ffi::ARCHIVE_FATAL;
                }
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Entries {}
