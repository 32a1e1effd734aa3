//! Write archives with the library and read them back

use libarchive::{
    ArchiveReader, ArchiveWriter, Entry, EntryKind, ExtractOptions, Result, WriteOptions,
};
use std::fs::{self, File};
use std::io::Read;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

fn read_all(path: &std::path::Path) -> Result<Vec<(Entry, Vec<u8>)>> {
    let mut reader = ArchiveReader::open(path)?;
    let mut out = Vec::new();
    while let Some(mut entry) = reader.next_entry()? {
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        out.push((entry.entry().clone(), data));
    }
    Ok(out)
}

#[test]
fn test_round_trip_formats() -> Result<()> {
    libarchive::init_tracing();
    let temp = TempDir::new()?;

    for name in ["src.tar", "src.tar.gz", "src.tar.bz2", "src.tar.xz", "src.zip", "src.cpio"] {
        let path = temp.path().join(name);

        let mut writer = ArchiveWriter::create(&path)?;
        writer.append_dir("src")?;
        writer.append_bytes("src/foo", b"foo\n")?;
        writer.append_bytes("src/bar", b"bar\n")?;
        writer.finish()?;

        let entries = read_all(&path)?;
        let files: Vec<(&str, &[u8])> = entries
            .iter()
            .filter(|(e, _)| e.kind() == EntryKind::File)
            .map(|(e, data)| (e.path(), data.as_slice()))
            .collect();

        assert_eq!(files, vec![("src/foo", &b"foo\n"[..]), ("src/bar", &b"bar\n"[..])], "{}", name);
        assert!(
            entries
                .iter()
                .any(|(e, _)| e.kind() == EntryKind::Directory && e.path().starts_with("src")),
            "{}",
            name
        );
    }

    Ok(())
}

#[test]
fn test_append_file_keeps_metadata() -> Result<()> {
    let temp = TempDir::new()?;
    let source = temp.path().join("foo");
    fs::write(&source, b"foo\n")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&source, fs::Permissions::from_mode(0o640))?;
    }
    let mtime = UNIX_EPOCH + Duration::from_secs(1_500_000_000);
    File::options().write(true).open(&source)?.set_modified(mtime)?;

    let tarball = temp.path().join("meta.tar");
    let mut writer = ArchiveWriter::create(&tarball)?;
    writer.append_file("src/foo", &mut File::open(&source)?)?;
    writer.finish()?;

    let entries = read_all(&tarball)?;
    assert_eq!(entries.len(), 1);

    let (entry, data) = &entries[0];
    assert_eq!(entry.path(), "src/foo");
    assert_eq!(entry.size(), Some(4));
    assert_eq!(entry.mtime(), Some(mtime));
    assert_eq!(data, b"foo\n");
    #[cfg(unix)]
    assert_eq!(entry.perm(), 0o640);

    Ok(())
}

#[test]
fn test_large_entry_spans_blocks() -> Result<()> {
    let temp = TempDir::new()?;
    let payload: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();

    let tarball = temp.path().join("large.tar.gz");
    let mut writer = ArchiveWriter::create(&tarball)?;
    writer.append_bytes("blob.bin", &payload)?;
    writer.finish()?;

    let entries = read_all(&tarball)?;
    assert_eq!(entries[0].1, payload);

    Ok(())
}

#[test]
fn test_append_path_walks_tree_in_order() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path().join("tree");
    fs::create_dir_all(root.join("b"))?;
    fs::write(root.join("c.txt"), b"c")?;
    fs::write(root.join("a.txt"), b"a")?;
    fs::write(root.join("b/inner.txt"), b"inner")?;
    #[cfg(unix)]
    std::os::unix::fs::symlink("a.txt", root.join("link"))?;

    let tarball = temp.path().join("tree.tar");
    let mut writer = ArchiveWriter::create(&tarball)?;
    let added = writer.append_path("tree", &root)?;
    assert_eq!(added, writer.entry_count());
    writer.finish()?;

    let paths: Vec<String> = ArchiveReader::open(&tarball)?
        .entries()
        .map(|e| e.map(|e| e.path().trim_end_matches('/').to_string()))
        .collect::<Result<_>>()?;

    let mut expected = vec!["tree", "tree/a.txt", "tree/b", "tree/b/inner.txt", "tree/c.txt"];
    #[cfg(unix)]
    expected.push("tree/link");
    assert_eq!(paths, expected);

    #[cfg(unix)]
    {
        let link = ArchiveReader::open(&tarball)?
            .entries()
            .filter_map(|e| e.ok())
            .find(|e| e.kind() == EntryKind::Symlink)
            .expect("symlink entry");
        assert_eq!(link.link_target(), Some("a.txt"));
    }

    Ok(())
}

#[test]
fn test_next_entry_skips_unread_data() -> Result<()> {
    let temp = TempDir::new()?;
    let tarball = temp.path().join("skip.tar");

    let mut writer = ArchiveWriter::create(&tarball)?;
    writer.append_bytes("first", &[1u8; 10_000])?;
    writer.append_bytes("second", b"second")?;
    writer.finish()?;

    let mut reader = ArchiveReader::open(&tarball)?;
    let first = reader.next_entry()?.expect("first entry");
    assert_eq!(first.entry().path(), "first");
    drop(first);

    let mut second = reader.next_entry()?.expect("second entry");
    let mut data = String::new();
    second.read_to_string(&mut data)?;
    assert_eq!(data, "second");
    drop(second);

    assert!(reader.next_entry()?.is_none());
    Ok(())
}

#[test]
fn test_explicit_skip_returns_header() -> Result<()> {
    let temp = TempDir::new()?;
    let tarball = temp.path().join("skip2.tar");

    let mut writer = ArchiveWriter::create(&tarball)?;
    writer.append_bytes("only", b"payload")?;
    writer.finish()?;

    let mut reader = ArchiveReader::open(&tarball)?;
    let header = reader.next_entry()?.expect("entry").skip()?;
    assert_eq!(header.path(), "only");
    assert_eq!(header.size(), Some(7));
    Ok(())
}

#[test]
fn test_read_from_memory() -> Result<()> {
    let temp = TempDir::new()?;
    let tarball = temp.path().join("mem.tar.gz");

    let mut writer = ArchiveWriter::create(&tarball)?;
    writer.append_bytes("hello", b"world")?;
    writer.finish()?;

    let reader = ArchiveReader::from_bytes(fs::read(&tarball)?)?;
    let entries: Vec<Entry> = reader.entries().collect::<Result<_>>()?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path(), "hello");
    Ok(())
}

#[test]
fn test_dropped_writer_still_produces_archive() -> Result<()> {
    let temp = TempDir::new()?;
    let tarball = temp.path().join("dropped.tar");

    {
        let mut writer = ArchiveWriter::create(&tarball)?;
        writer.append_bytes("kept", b"kept")?;
    }

    let entries = read_all(&tarball)?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, b"kept");
    Ok(())
}

#[test]
fn test_truncated_archive_ends_iteration_with_one_error() -> Result<()> {
    let temp = TempDir::new()?;
    let tarball = temp.path().join("many.tar.gz");

    // Poorly compressible data so that cutting the file lands mid-archive
    let mut state = 0x2545_f491u32;
    let mut writer = ArchiveWriter::create(&tarball)?;
    for i in 0..20 {
        let data: Vec<u8> = (0..4096)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect();
        writer.append_bytes(format!("file_{:02}", i), &data)?;
    }
    writer.finish()?;

    let mut bytes = fs::read(&tarball)?;
    bytes.truncate(bytes.len() / 2);

    let mut entries = ArchiveReader::from_bytes(bytes)?.entries();
    let items: Vec<Result<Entry>> = entries.by_ref().collect();

    let errors = items.iter().filter(|item| item.is_err()).count();
    assert_eq!(errors, 1);
    assert!(matches!(items.last(), Some(Err(libarchive::Error::LibArchive { .. }))));
    assert!(items.len() > 1 && items.len() < 21);
    assert!(entries.next().is_none());
    Ok(())
}

#[test]
fn test_pax_keeps_subsecond_mtime() -> Result<()> {
    let temp = TempDir::new()?;
    let tarball = temp.path().join("nanos.tar");
    let mtime = UNIX_EPOCH + Duration::new(1_600_000_000, 250_000_000);

    let options = WriteOptions {
        format: Some("pax".to_string()),
        ..WriteOptions::default()
    };
    let mut writer = ArchiveWriter::create_with(&tarball, &options)?;
    writer.append_entry(&Entry::file("stamp", 2).with_mtime(mtime), &b"ok"[..])?;
    writer.finish()?;

    let entries = read_all(&tarball)?;
    assert_eq!(entries[0].0.mtime(), Some(mtime));

    let dest = temp.path().join("out");
    ArchiveReader::open(&tarball)?.unpack(&dest, &ExtractOptions::default())?;
    assert_eq!(fs::metadata(dest.join("stamp"))?.modified()?, mtime);
    Ok(())
}
