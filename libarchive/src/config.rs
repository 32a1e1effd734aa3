//! Configuration loading and option types.
//!
//! Options can be built in code or loaded from a TOML file:
//!
//! ```toml
//! log_level = "debug"
//!
//! [read]
//! block_size = 16384
//!
//! [write]
//! format = "pax"
//! filters = ["zstd"]
//!
//! [extract]
//! overwrite = true
//! strip_components = 1
//! ```
//!
//! ```rust,no_run
//! use libarchive::config::{ArchiveConfig, ConfigLoader, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = ArchiveConfig::load(Path::new("larc.toml"))?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

use crate::extract::{ExtractFlags, ExtractOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Options for opening archives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Read block size; the file system's preferred size when unset
    pub block_size: Option<usize>,
}

/// Options for creating archives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// libarchive format name (`pax`, `ustar`, `zip`, `7zip`, `cpio`, ...);
    /// chosen from the file extension when unset
    pub format: Option<String>,
    /// Compression filters by name (`gzip`, `bzip2`, `xz`, `zstd`, ...)
    pub filters: Vec<String>,
    /// Output blocking for block-oriented formats
    pub bytes_per_block: Option<usize>,
    /// Chunk size for streaming entry data
    pub block_size: Option<usize>,
}

/// Extraction settings as stored in a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Restore permission bits
    pub preserve_permissions: bool,
    /// Restore modification times
    pub preserve_mtime: bool,
    /// Replace existing files
    pub overwrite: bool,
    /// Refuse to write through symlinks inside the target directory
    pub secure_symlinks: bool,
    /// Leading path components to drop
    pub strip_components: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        let defaults = ExtractOptions::default();
        Self {
            preserve_permissions: defaults.flags.contains(ExtractFlags::PERMISSIONS),
            preserve_mtime: defaults.flags.contains(ExtractFlags::MTIME),
            overwrite: defaults.flags.contains(ExtractFlags::OVERWRITE),
            secure_symlinks: defaults.flags.contains(ExtractFlags::SECURE_SYMLINKS),
            strip_components: defaults.strip_components,
        }
    }
}

impl From<&ExtractConfig> for ExtractOptions {
    fn from(config: &ExtractConfig) -> Self {
        let mut flags = ExtractFlags::empty();
        flags.set(ExtractFlags::PERMISSIONS, config.preserve_permissions);
        flags.set(ExtractFlags::MTIME, config.preserve_mtime);
        flags.set(ExtractFlags::OVERWRITE, config.overwrite);
        flags.set(ExtractFlags::SECURE_SYMLINKS, config.secure_symlinks);

        ExtractOptions {
            flags,
            strip_components: config.strip_components,
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Logging verbosity level.
    pub log_level: LogLevel,
    /// Reader settings
    pub read: ReadOptions,
    /// Writer settings
    pub write: WriteOptions,
    /// Extraction settings
    pub extract: ExtractConfig,
}

impl ArchiveConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - a block size is zero
    /// - the format name or a filter name is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read.block_size == Some(0) {
            return Err(ConfigError::ValidationError(
                "read.block_size cannot be zero".to_string(),
            ));
        }
        if self.write.block_size == Some(0) || self.write.bytes_per_block == Some(0) {
            return Err(ConfigError::ValidationError(
                "write block sizes cannot be zero".to_string(),
            ));
        }
        if self.write.format.as_deref() == Some("") {
            return Err(ConfigError::ValidationError(
                "write.format cannot be empty".to_string(),
            ));
        }
        if self.write.filters.iter().any(|f| f.is_empty()) {
            return Err(ConfigError::ValidationError(
                "write.filters cannot contain empty names".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        for (text, level) in [
            ("trace", LogLevel::Trace),
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warn", LogLevel::Warn),
            ("error", LogLevel::Error),
        ] {
            let parsed: TestWrapper = toml::from_str(&format!("level = \"{}\"", text)).unwrap();
            assert_eq!(parsed.level, level);
            assert_eq!(level.as_directive(), text);
        }
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: ArchiveConfig = toml::from_str("").unwrap();
        assert_eq!(config, ArchiveConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"

[read]
block_size = 16384

[write]
format = "pax"
filters = ["zstd"]

[extract]
overwrite = true
strip_components = 1
"#
        )
        .unwrap();

        let config = ArchiveConfig::load(file.path()).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.read.block_size, Some(16384));
        assert_eq!(config.write.format.as_deref(), Some("pax"));
        assert_eq!(config.write.filters, vec!["zstd".to_string()]);
        assert!(config.extract.overwrite);
        assert!(config.extract.preserve_permissions);

        let options = ExtractOptions::from(&config.extract);
        assert!(options.flags.contains(ExtractFlags::OVERWRITE));
        assert_eq!(options.strip_components, 1);
    }

    #[test]
    fn test_missing_file() {
        let result = ArchiveConfig::load(Path::new("/nonexistent/larc.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[read\nblock_size = ").unwrap();
        assert!(matches!(
            ArchiveConfig::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_block_size() {
        let mut config = ArchiveConfig::default();
        config.read.block_size = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_empty_filter() {
        let mut config = ArchiveConfig::default();
        config.write.filters.push(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_extract_config_matches_options() {
        let options = ExtractOptions::from(&ExtractConfig::default());
        assert_eq!(options, ExtractOptions::default());
    }
}
