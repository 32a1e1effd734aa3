//! Subcommand implementations

use crate::{CreateArgs, ExtractArgs, ListArgs};
use libarchive::{
    ArchiveConfig, ArchiveReader, ArchiveWriter, Entry, EntryKind, ExtractFlags, ExtractOptions,
    library_version,
};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::{info, warn};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// JSON line emitted by `larc list --json`
#[derive(Debug, Serialize)]
struct ListedEntry<'a> {
    path: &'a str,
    kind: &'static str,
    size: Option<u64>,
    perm: u32,
    mtime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_target: Option<&'a str>,
}

fn kind_name(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::File => "file",
        EntryKind::Directory => "directory",
        EntryKind::Symlink => "symlink",
        EntryKind::HardLink => "hardlink",
        EntryKind::CharDevice => "char-device",
        EntryKind::BlockDevice => "block-device",
        EntryKind::Fifo => "fifo",
        EntryKind::Socket => "socket",
        EntryKind::Unknown(_) => "unknown",
    }
}

fn mtime_secs(entry: &Entry) -> Option<u64> {
    entry
        .mtime()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

fn open_reader(path: &Path, config: &ArchiveConfig) -> libarchive::Result<ArchiveReader> {
    if path == Path::new("-") {
        ArchiveReader::stdin()
    } else {
        ArchiveReader::open_with(path, &config.read)
    }
}

/// `larc list`
pub fn list<W: Write>(args: &ListArgs, config: &ArchiveConfig, out: &mut W) -> CommandResult {
    let reader = open_reader(&args.archive, config)?;

    for entry in reader {
        let entry = entry?;

        if args.json {
            let listed = ListedEntry {
                path: entry.path(),
                kind: kind_name(entry.kind()),
                size: entry.size(),
                perm: entry.perm(),
                mtime: mtime_secs(&entry),
                link_target: entry.link_target(),
            };
            serde_json::to_writer(&mut *out, &listed)?;
            writeln!(out)?;
        } else if args.long {
            let owner = entry
                .uname()
                .map(str::to_string)
                .unwrap_or_else(|| entry.uid().to_string());
            let group = entry
                .gname()
                .map(str::to_string)
                .unwrap_or_else(|| entry.gid().to_string());
            write!(
                out,
                "{}{:04o} {:>8} {:>8} {:>10} {:>11} {}",
                entry.kind().tag(),
                entry.perm(),
                owner,
                group,
                entry.size().unwrap_or(0),
                mtime_secs(&entry).unwrap_or(0),
                entry.path()
            )?;
            match entry.link_target() {
                Some(target) => writeln!(out, " -> {}", target)?,
                None => writeln!(out)?,
            }
        } else {
            writeln!(out, "{}", entry.path())?;
        }
    }

    out.flush()?;
    Ok(())
}

/// `larc create`
pub fn create(args: &CreateArgs, config: &ArchiveConfig) -> CommandResult {
    let mut options = config.write.clone();
    if args.format.is_some() {
        options.format = args.format.clone();
    }
    if !args.filters.is_empty() {
        options.filters = args.filters.clone();
    }

    let mut writer = ArchiveWriter::create_with(&args.archive, &options)?;

    for path in &args.paths {
        let fs_path = match &args.directory {
            Some(dir) => dir.join(path),
            None => path.clone(),
        };

        let archive_path = match path.strip_prefix("/") {
            Ok(relative) => {
                warn!("Removing leading '/' from {}", path.display());
                relative
            }
            Err(_) => path.as_path(),
        };

        let added = writer.append_path(archive_path, &fs_path)?;
        info!("Added {} ({} entries)", path.display(), added);
    }

    writer.finish()?;
    Ok(())
}

/// `larc extract`
pub fn extract(args: &ExtractArgs, config: &ArchiveConfig) -> CommandResult {
    let mut options = ExtractOptions::from(&config.extract);
    if args.overwrite {
        options.flags.insert(ExtractFlags::OVERWRITE);
    }
    if args.no_same_permissions {
        options.flags.remove(ExtractFlags::PERMISSIONS);
    }
    if let Some(strip) = args.strip_components {
        options.strip_components = strip;
    }

    let mut reader = open_reader(&args.archive, config)?;
    let count = reader.unpack(&args.directory, &options)?;
    info!("Extracted {} entries", count);
    Ok(())
}

/// `larc version`
pub fn version<W: Write>(out: &mut W) -> CommandResult {
    let library = library_version();
    writeln!(out, "larc {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "{} ({})", library.description, library)?;
    Ok(())
}
