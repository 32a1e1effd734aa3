//! Extraction of archive entries onto the file system

use crate::entry::{Entry, EntryKind};
use crate::error::{Error, Result};
use crate::reader::ArchiveReader;
use bitflags::bitflags;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

bitflags! {
    /// What to restore and how careful to be while extracting
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExtractFlags: u32 {
        /// Restore permission bits
        const PERMISSIONS = 1 << 0;
        /// Restore modification times
        const MTIME = 1 << 1;
        /// Replace existing files and links
        const OVERWRITE = 1 << 2;
        /// Never write through a symlink inside the target directory
        const SECURE_SYMLINKS = 1 << 3;
    }
}

/// Extraction settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Behaviour flags
    pub flags: ExtractFlags,
    /// Leading path components to drop from every entry
    pub strip_components: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            flags: ExtractFlags::PERMISSIONS | ExtractFlags::MTIME | ExtractFlags::SECURE_SYMLINKS,
            strip_components: 0,
        }
    }
}

/// Relative path an entry should be written to.
///
/// `None` when the path is absolute, climbs out with `..`, or is empty once
/// `strip` leading components are removed.
pub fn sanitize_entry_path(path: &str, strip: usize) -> Option<PathBuf> {
    if is_unsafe_path(path) {
        return None;
    }

    let mut out = PathBuf::new();
    let mut stripped = 0;
    for component in Path::new(path).components() {
        if let Component::Normal(part) = component {
            if stripped < strip {
                stripped += 1;
            } else {
                out.push(part);
            }
        }
    }

    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

fn is_unsafe_path(path: &str) -> bool {
    path.starts_with('/')
        || path.starts_with('\\')
        || Path::new(path).components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        })
}

/// Fail if any existing ancestor of `rel` below `root` is a symlink
fn ensure_no_symlink_ancestors(root: &Path, rel: &Path, entry_path: &str) -> Result<()> {
    let mut current = root.to_path_buf();
    let parent_count = rel.components().count().saturating_sub(1);

    for component in rel.components().take(parent_count) {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(Error::UnsafePath {
                    path: entry_path.to_string(),
                });
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Remove whatever non-directory sits at `target` when overwriting
fn clear_existing(target: &Path, options: &ExtractOptions) -> Result<()> {
    if !options.flags.contains(ExtractFlags::OVERWRITE) {
        return Ok(());
    }
    match fs::symlink_metadata(target) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(target)?,
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Refuse (or, when overwriting, remove) a symlink sitting where a directory
/// entry is about to be created
fn ensure_not_symlink(target: &Path, entry_path: &str, options: &ExtractOptions) -> Result<()> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if options.flags.contains(ExtractFlags::OVERWRITE) {
                debug!("Replacing symlink at {}", target.display());
                fs::remove_file(target)?;
                Ok(())
            } else {
                Err(Error::UnsafePath {
                    path: entry_path.to_string(),
                })
            }
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn create_parent(target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn apply_metadata(target: &Path, entry: &Entry, options: &ExtractOptions) -> Result<()> {
    if options.flags.contains(ExtractFlags::MTIME) {
        if let Some(mtime) = entry.mtime() {
            let file = fs::File::options().write(true).open(target)?;
            file.set_modified(mtime)?;
        }
    }

    #[cfg(unix)]
    if options.flags.contains(ExtractFlags::PERMISSIONS) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(target, fs::Permissions::from_mode(entry.perm()))?;
    }

    Ok(())
}

fn apply_dir_metadata(target: &Path, entry: &Entry, options: &ExtractOptions) -> Result<()> {
    // Both calls below follow symlinks; only touch a real directory.
    let meta = fs::symlink_metadata(target)?;
    if !meta.is_dir() {
        warn!(
            "Not restoring metadata of {}: no longer a directory",
            target.display()
        );
        return Ok(());
    }

    if options.flags.contains(ExtractFlags::MTIME) {
        if let Some(mtime) = entry.mtime() {
            let times = fs::FileTimes::new().set_modified(mtime);
            // Directories cannot be opened for writing; use a read handle.
            let dir = fs::File::open(target)?;
            dir.set_times(times)?;
        }
    }

    #[cfg(unix)]
    if options.flags.contains(ExtractFlags::PERMISSIONS) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(target, fs::Permissions::from_mode(entry.perm()))?;
    }

    Ok(())
}

/// Extract every entry of `reader` below `dir`.
///
/// Returns the number of entries materialised. Entries whose path is empty
/// after stripping are skipped; unsafe paths abort with `Error::UnsafePath`.
pub fn unpack(reader: &mut ArchiveReader, dir: &Path, options: &ExtractOptions) -> Result<usize> {
    fs::create_dir_all(dir)?;

    let secure = options.flags.contains(ExtractFlags::SECURE_SYMLINKS);
    let mut count = 0;
    // Directory metadata is applied last so children can still be created.
    let mut directories: Vec<(PathBuf, Entry)> = Vec::new();

    while let Some(mut entry_reader) = reader.next_entry()? {
        let entry = entry_reader.entry().clone();

        if is_unsafe_path(entry.path()) {
            return Err(Error::UnsafePath {
                path: entry.path().to_string(),
            });
        }
        let rel = match sanitize_entry_path(entry.path(), options.strip_components) {
            Some(rel) => rel,
            None => {
                debug!("Skipping {} (empty after stripping)", entry.path());
                continue;
            }
        };

        if secure {
            ensure_no_symlink_ancestors(dir, &rel, entry.path())?;
        }
        let target = dir.join(&rel);

        match entry.kind() {
            EntryKind::Directory => {
                if secure {
                    ensure_not_symlink(&target, entry.path(), options)?;
                }
                fs::create_dir_all(&target)?;
                directories.push((target, entry));
            }
            EntryKind::File => {
                create_parent(&target)?;
                clear_existing(&target, options)?;

                let mut file = OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&target)?;
                io::copy(&mut entry_reader, &mut file)?;
                drop(file);

                apply_metadata(&target, &entry, options)?;
            }
            EntryKind::Symlink => {
                let Some(link) = entry.link_target() else {
                    warn!("Skipping symlink {} without target", entry.path());
                    continue;
                };
                create_parent(&target)?;
                clear_existing(&target, options)?;

                #[cfg(unix)]
                std::os::unix::fs::symlink(link, &target)?;
                #[cfg(not(unix))]
                {
                    warn!("Skipping symlink {} -> {} (unsupported platform)", entry.path(), link);
                    continue;
                }
            }
            EntryKind::HardLink => {
                let source = entry
                    .link_target()
                    .and_then(|link| sanitize_entry_path(link, options.strip_components))
                    .ok_or_else(|| Error::UnsafePath {
                        path: entry.path().to_string(),
                    })?;
                if secure {
                    ensure_no_symlink_ancestors(dir, &source, entry.path())?;
                }
                create_parent(&target)?;
                clear_existing(&target, options)?;
                fs::hard_link(dir.join(source), &target)?;
            }
            other => {
                warn!("Skipping {} ({:?} entries are not extracted)", entry.path(), other);
                continue;
            }
        }

        debug!("Extracted {}", rel.display());
        count += 1;
    }

    // Deepest first, so a restrictive parent mode cannot lock out its children
    directories.sort_by_key(|(target, _)| std::cmp::Reverse(target.components().count()));
    for (target, entry) in &directories {
        apply_dir_metadata(target, entry, options)?;
    }

    info!("Extracted {} entries into {}", count, dir.display());
    Ok(count)
}
