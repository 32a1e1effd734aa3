//! # libarchive
//!
//! Safe bindings for reading and writing archives through the system
//! libarchive. Anything libarchive understands can be read (tar, pax, cpio,
//! zip, 7z, iso9660, ar, ... under gzip, bzip2, xz, zstd, lz4, ...), and the
//! common formats can be written.
//!
//! ## Reading
//!
//! ```rust,no_run
//! use libarchive::ArchiveReader;
//!
//! # fn main() -> libarchive::Result<()> {
//! let archive = ArchiveReader::open("src.tar.gz")?;
//! for entry in archive {
//!     let entry = entry?;
//!     println!("{} {:?}", entry.path(), entry.size());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Entry data is streamed through [`EntryReader`], which implements
//! [`std::io::Read`]:
//!
//! ```rust,no_run
//! use libarchive::ArchiveReader;
//! use std::io::Read;
//!
//! # fn main() -> libarchive::Result<()> {
//! let mut archive = ArchiveReader::open("src.tar.gz")?;
//! while let Some(mut entry) = archive.next_entry()? {
//!     let mut contents = Vec::new();
//!     entry.read_to_end(&mut contents)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Writing
//!
//! The output format follows the file extension unless
//! [`WriteOptions`] say otherwise:
//!
//! ```rust,no_run
//! use libarchive::ArchiveWriter;
//! use std::fs::File;
//!
//! # fn main() -> libarchive::Result<()> {
//! let mut archive = ArchiveWriter::create("src.tar.gz")?;
//! archive.append_dir("src")?;
//! archive.append_file("src/foo", &mut File::open("foo")?)?;
//! archive.append_bytes("src/bar", b"bar\n")?;
//! archive.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Extracting
//!
//! ```rust,no_run
//! use libarchive::{ArchiveReader, ExtractOptions};
//!
//! # fn main() -> libarchive::Result<()> {
//! let mut archive = ArchiveReader::open("src.tar.gz")?;
//! archive.unpack("out", &ExtractOptions::default())?;
//! # Ok(())
//! # }
//! ```
//!
//! Absolute paths, `..` components and writes through symlinks are refused.
//!
//! ## Thread Safety
//!
//! Readers and writers are `Send` but not `Sync`: a handle can move to
//! another thread, but libarchive handles must not be used concurrently.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod entry;
pub mod error;
pub mod extract;
mod handle;
pub mod platform;
pub mod reader;
pub mod version;
pub mod writer;

pub use config::{ArchiveConfig, ConfigError, ConfigLoader, LogLevel, ReadOptions, WriteOptions};
pub use entry::{Entry, EntryKind, EntryReader};
pub use error::{Error, ErrorKind, Result};
pub use extract::{ExtractFlags, ExtractOptions, sanitize_entry_path};
pub use reader::{ArchiveReader, Entries};
pub use version::{LibraryVersion, library_version};
pub use writer::ArchiveWriter;

static_assertions::assert_impl_all!(ArchiveReader: Send);
static_assertions::assert_impl_all!(ArchiveWriter: Send);
static_assertions::assert_not_impl_any!(ArchiveReader: Sync);
static_assertions::assert_not_impl_any!(ArchiveWriter: Sync);
static_assertions::assert_impl_all!(Error: Send, Sync, std::error::Error);

/// Initialize tracing from `RUST_LOG`
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
