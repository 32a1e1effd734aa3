//! Linked libarchive version

use crate::handle::string_from_ptr;
use std::fmt;

/// Version of the libarchive library linked at run time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryVersion {
    /// Packed version number, `major * 1_000_000 + minor * 1_000 + patch`
    pub number: u32,
    /// Human-readable description, e.g. `libarchive 3.7.2`
    pub description: String,
}

impl LibraryVersion {
    /// Build from a packed version number
    pub fn from_number(number: u32, description: impl Into<String>) -> Self {
        Self {
            number,
            description: description.into(),
        }
    }

    /// Major version
    pub fn major(&self) -> u32 {
        self.number / 1_000_000
    }

    /// Minor version
    pub fn minor(&self) -> u32 {
        self.number / 1_000 % 1_000
    }

    /// Patch level
    pub fn patch(&self) -> u32 {
        self.number % 1_000
    }

    /// Whether the library is at least `major.minor`
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major(), self.minor()) >= (major, minor)
    }
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// Query the linked libarchive
pub fn library_version() -> LibraryVersion {
    let number = unsafe { ffi::archive_version_number() };
    let description = unsafe { string_from_ptr(ffi::archive_version_string()) }
        .unwrap_or_else(|| "libarchive".to_string());

    LibraryVersion::from_number(u32::try_from(number).unwrap_or(0), description)
}
