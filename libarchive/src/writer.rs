//! Archive writer

use crate::config::WriteOptions;
use crate::entry::{Entry, EntryKind};
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::platform::{DEFAULT_BLOCK_SIZE, path_to_cstring, preferred_block_size, str_to_cstring};
use libc::{c_int, c_void};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Writer producing a single archive file
pub struct ArchiveWriter {
    handle: Handle,
    block_size: usize,
    entry_count: usize,
}

impl ArchiveWriter {
    /// Chunk size used when streaming entry data
    pub const DEFAULT_BLOCK_SIZE: usize = DEFAULT_BLOCK_SIZE;

    /// Create an archive whose format and compression follow the file
    /// extension (`.tar.gz`, `.zip`, `.7z`, ...)
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with(path, &WriteOptions::default())
    }

    /// Create an archive with explicit format, filters and blocking
    pub fn create_with<P: AsRef<Path>>(path: P, options: &WriteOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = path_to_cstring(path)?;
        let handle = Handle::new_write()?;

        match &options.format {
            Some(format) => {
                let format = str_to_cstring(format)?;
                let code =
                    unsafe { ffi::archive_write_set_format_by_name(handle.as_ptr(), format.as_ptr()) };
                handle.check(code)?;
            }
            None => {
                let code = unsafe {
                    ffi::archive_write_set_format_filter_by_ext(handle.as_ptr(), file.as_ptr())
                };
                handle.check(code)?;
            }
        }

        for filter in &options.filters {
            let filter = str_to_cstring(filter)?;
            let code =
                unsafe { ffi::archive_write_add_filter_by_name(handle.as_ptr(), filter.as_ptr()) };
            handle.check(code)?;
        }

        if let Some(bytes_per_block) = options.bytes_per_block {
            let bytes_per_block = c_int::try_from(bytes_per_block).map_err(|_| Error::Io {
                source: io::Error::new(io::ErrorKind::InvalidInput, "bytes_per_block too large"),
            })?;
            let code =
                unsafe { ffi::archive_write_set_bytes_per_block(handle.as_ptr(), bytes_per_block) };
            handle.check(code)?;
        }

        let code = unsafe { ffi::archive_write_open_filename(handle.as_ptr(), file.as_ptr()) };
        handle.check(code)?;

        info!(
            "Creating archive {} ({})",
            path.display(),
            handle.format_name().unwrap_or_else(|| "unknown format".to_string())
        );

        Ok(Self {
            handle,
            block_size: options.block_size.unwrap_or(Self::DEFAULT_BLOCK_SIZE),
            entry_count: 0,
        })
    }

    /// Chunk size used for in-memory and reader input
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of entries written so far
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Selected output format
    pub fn format_name(&self) -> Option<String> {
        self.handle.format_name()
    }

    /// Append an open file under `path`, copying size, permissions, mtime and owner
    pub fn append_file<P: AsRef<Path>>(&mut self, path: P, file: &mut File) -> Result<()> {
        let meta = file.metadata()?;
        let entry = Entry::from_metadata(archive_name(path.as_ref()), &meta);
        let chunk = preferred_block_size(&meta);
        self.write_entry(&entry, file, chunk)
    }

    /// Append a regular file with the given contents
    pub fn append_bytes<P: AsRef<Path>>(&mut self, path: P, data: &[u8]) -> Result<()> {
        let entry = Entry::file(archive_name(path.as_ref()), data.len() as u64)
            .with_mtime(SystemTime::now());
        self.append_entry(&entry, data)
    }

    /// Append a directory
    pub fn append_dir<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let entry = Entry::directory(archive_name(path.as_ref())).with_mtime(SystemTime::now());
        self.append_entry(&entry, io::empty())
    }

    /// Append a symbolic link to `target`
    pub fn append_symlink<P: AsRef<Path>>(&mut self, path: P, target: &str) -> Result<()> {
        let entry =
            Entry::symlink(archive_name(path.as_ref()), target).with_mtime(SystemTime::now());
        self.append_entry(&entry, io::empty())
    }

    /// Append an entry, reading its data from `data`.
    ///
    /// Only regular files carry data. At most `entry.size()` bytes are
    /// consumed; a shorter input is zero-padded by libarchive.
    pub fn append_entry<R: Read>(&mut self, entry: &Entry, data: R) -> Result<()> {
        let chunk = self.block_size;
        self.write_entry(entry, data, chunk)
    }

    /// Append a file system object: files, symlinks, and directories
    /// recursively in sorted order. Returns the number of entries added.
    pub fn append_path<A: AsRef<Path>, P: AsRef<Path>>(
        &mut self,
        archive_path: A,
        fs_path: P,
    ) -> Result<usize> {
        let name = archive_name(archive_path.as_ref());
        let fs_path = fs_path.as_ref();
        let meta = fs::symlink_metadata(fs_path)?;
        let file_type = meta.file_type();

        if file_type.is_symlink() {
            let target = fs::read_link(fs_path)?;
            let entry =
                Entry::from_metadata(name, &meta).with_link_target(target.to_string_lossy());
            self.append_entry(&entry, io::empty())?;
            Ok(1)
        } else if file_type.is_dir() {
            let entry = Entry::from_metadata(format!("{}/", name.trim_end_matches('/')), &meta);
            self.append_entry(&entry, io::empty())?;

            let mut children = fs::read_dir(fs_path)?
                .map(|child| child.map(|c| c.path()))
                .collect::<io::Result<Vec<_>>>()?;
            children.sort();

            let mut added = 1;
            for child in children {
                let child_name = match child.file_name() {
                    Some(file_name) => file_name.to_string_lossy().into_owned(),
                    None => continue,
                };
                let child_archive_path = format!("{}/{}", name.trim_end_matches('/'), child_name);
                added += self.append_path(child_archive_path, &child)?;
            }
            Ok(added)
        } else if file_type.is_file() {
            let mut file = File::open(fs_path)?;
            self.append_file(name, &mut file)?;
            Ok(1)
        } else {
            warn!("Skipping special file {}", fs_path.display());
            Ok(0)
        }
    }

    fn write_entry<R: Read>(&mut self, entry: &Entry, data: R, chunk: usize) -> Result<()> {
        let raw = entry.to_raw()?;
        let code = unsafe { ffi::archive_write_header(self.handle.as_ptr(), raw.as_ptr()) };
        self.handle.check(code)?;

        if entry.kind() == EntryKind::File {
            let declared = entry.size().unwrap_or(0);
            let mut data = data.take(declared);
            let mut buf = vec![0u8; chunk.max(1)];
            let mut written = 0u64;

            loop {
                let nbytes = match data.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };
                self.write_data(&buf[..nbytes])?;
                written += nbytes as u64;
            }

            if written < declared {
                warn!(
                    "Entry {} declared {} bytes but only {} were available",
                    entry.path(),
                    declared,
                    written
                );
            }
        }

        let code = unsafe { ffi::archive_write_finish_entry(self.handle.as_ptr()) };
        self.handle.check(code)?;

        self.entry_count += 1;
        debug!("Appended {} ({:?})", entry.path(), entry.kind());
        Ok(())
    }

    fn write_data(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            let n = unsafe {
                ffi::archive_write_data(self.handle.as_ptr(), buf.as_ptr() as *const c_void, buf.len())
            };

            if n < 0 {
                return Err(self.handle.error(n as c_int));
            }
            if n == 0 {
                return Err(Error::Io {
                    source: io::Error::new(io::ErrorKind::WriteZero, "archive accepted no more data"),
                });
            }
            buf = &buf[n as usize..];
        }
        Ok(())
    }

    /// Flush and close the archive, reporting any error.
    ///
    /// Dropping a writer also closes it, but errors are only logged.
    pub fn finish(mut self) -> Result<()> {
        self.handle.close()?;
        info!("Archive closed with {} entries", self.entry_count);
        Ok(())
    }
}

/// In-archive name for a path, always with `/` separators
fn archive_name(path: &Path) -> String {
    let name = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        name.into_owned()
    } else {
        name.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
