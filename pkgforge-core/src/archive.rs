//! Shared archive emission helpers for the format writers.
//!
//! Everything here enforces the reproducibility rules: ownership is forced
//! to `root:0/0`, header timestamps are written as zero and the gzip header
//! mtime is pinned to the epoch. The one documented exception (the DEB AR
//! member mtime) lives in the DEB writer.

pub use flate2;
pub use tar;

use crate::digest;
use crate::error::PackagingError;
use crate::walk::{EntryKind, FileEntry};
use crate::{ErrContext, Result};

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::trace;

/// Controls how walked entries are laid out inside a tar stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct TarOptions {
    /// Emit PAX records pinning mtime/atime/ctime to `0` on every entry.
    pub pax_times: bool,
    /// Attach an `APK-TOOLS.checksum.SHA1` PAX record to regular files.
    pub sha1_records: bool,
    /// Prefix prepended to every archived name (e.g. `./`).
    pub prefix: &'static str,
}

/// A gzip stream whose header mtime is fixed to the epoch.
pub fn gz_writer<W: Write>(writer: W) -> GzEncoder<W> {
    GzBuilder::new().mtime(0).write(writer, Compression::default())
}

/// A zstd stream at the default compression level.
pub fn zstd_writer<W: Write>(writer: W) -> Result<zstd::stream::write::Encoder<'static, W>> {
    zstd::stream::write::Encoder::new(writer, 0).context("failed to initialize zstd stream")
}

/// The name an entry is archived under.
pub fn entry_name(entry: &FileEntry, prefix: &str) -> String {
    let mut name = format!("{}{}", prefix, entry.destination.trim_start_matches('/'));
    if entry.kind.is_dir() && !name.ends_with('/') {
        name.push('/');
    }
    name
}

fn base_header(entry: &FileEntry, name: &str) -> Result<tar::Header> {
    let mut header = tar::Header::new_ustar();
    header.set_mode(entry.permissions());
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header
        .set_username("root")
        .and_then(|_| header.set_groupname("root"))
        .map_err(|e| PackagingError::encoding(name, "writing header", e))?;
    Ok(header)
}

/// Appends one walked entry to a tar stream with the shared header
/// discipline.
pub fn append_entry<W: Write>(
    builder: &mut tar::Builder<W>,
    entry: &FileEntry,
    options: &TarOptions,
) -> Result<()> {
    let name = entry_name(entry, options.prefix);
    trace!(entry = %name, "archiving");

    if options.pax_times {
        let mut records: Vec<(&str, String)> = vec![
            ("mtime", "0".to_string()),
            ("atime", "0".to_string()),
            ("ctime", "0".to_string()),
        ];
        if options.sha1_records && entry.kind.is_file() {
            records.push((
                "APK-TOOLS.checksum.SHA1",
                digest::sha1_file(&entry.source)?,
            ));
        }
        builder
            .append_pax_extensions(records.iter().map(|(k, v)| (*k, v.as_bytes())))
            .map_err(|e| PackagingError::encoding(&name, "writing header", e))?;
    }

    let mut header = base_header(entry, &name)?;
    match entry.kind {
        EntryKind::Dir | EntryKind::ImplicitDir => {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            builder
                .append_data(&mut header, &name, std::io::empty())
                .map_err(|e| PackagingError::encoding(&name, "writing header", e))?;
        }
        EntryKind::Symlink => {
            let target = entry
                .link_target
                .as_deref()
                .ok_or_else(|| anyhow!("symlink entry `{}` has no target", name))?;
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            builder
                .append_link(&mut header, &name, target)
                .map_err(|e| PackagingError::encoding(&name, "writing header", e))?;
        }
        EntryKind::File | EntryKind::Config | EntryKind::ConfigNoReplace => {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(entry.size);
            let file = File::open(&entry.source)
                .map_err(|e| PackagingError::fs("opening for archive", &entry.source, e))?;
            builder
                .append_data(&mut header, &name, file)
                .map_err(|e| PackagingError::encoding(&name, "writing data", e))?;
        }
    }
    Ok(())
}

/// Appends every entry in walk order.
pub fn append_entries<W: Write>(
    builder: &mut tar::Builder<W>,
    entries: &[FileEntry],
    options: &TarOptions,
) -> Result<()> {
    for entry in entries {
        append_entry(builder, entry, options)?;
    }
    Ok(())
}

fn ar_header(name: &str, size: u64, mtime: u64) -> ar::Header {
    let mut header = ar::Header::new(name.as_bytes().to_vec(), size);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(mtime);
    header
}

/// Appends an in-memory AR member.
pub fn ar_member_bytes<W: Write>(
    builder: &mut ar::Builder<W>,
    name: &str,
    data: &[u8],
    mtime: u64,
) -> Result<()> {
    builder
        .append(&ar_header(name, data.len() as u64, mtime), data)
        .map_err(|e| PackagingError::encoding(name, "writing ar member", e).into())
}

/// Appends an on-disk file as an AR member.
pub fn ar_member_file<W: Write>(
    builder: &mut ar::Builder<W>,
    name: &str,
    path: &Path,
    mtime: u64,
) -> Result<()> {
    let file = File::open(path).map_err(|e| PackagingError::fs("opening for archive", path, e))?;
    let size = file
        .metadata()
        .map_err(|e| PackagingError::fs("reading metadata of", path, e))?
        .len();
    builder
        .append(&ar_header(name, size, mtime), file)
        .map_err(|e| PackagingError::encoding(name, "writing ar member", e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::{walk, WalkOptions};
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn stage() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("usr/bin")).unwrap();
        std::fs::write(dir.path().join("usr/bin/hello"), b"Hello, world!\n").unwrap();
        std::os::unix::fs::symlink("hello", dir.path().join("usr/bin/hi")).unwrap();
        dir
    }

    #[test]
    fn tar_entries_are_root_owned_with_zero_mtime() {
        let dir = stage();
        let entries = walk(dir.path(), &WalkOptions::default()).unwrap();

        let mut buf = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut buf);
            append_entries(&mut builder, &entries, &TarOptions::default()).unwrap();
            builder.finish().unwrap();
        }

        let mut archive = tar::Archive::new(&buf[..]);
        let mut names = Vec::new();
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            let header = entry.header();
            assert_eq!(header.uid().unwrap(), 0);
            assert_eq!(header.gid().unwrap(), 0);
            assert_eq!(header.mtime().unwrap(), 0);
            names.push(entry.path().unwrap().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["usr/", "usr/bin/", "usr/bin/hello", "usr/bin/hi"]);
    }

    #[test]
    fn pax_records_carry_the_sha1_checksum() {
        let dir = stage();
        let entries = walk(dir.path(), &WalkOptions::default()).unwrap();

        let mut buf = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut buf);
            append_entries(
                &mut builder,
                &entries,
                &TarOptions {
                    pax_times: true,
                    sha1_records: true,
                    prefix: "",
                },
            )
            .unwrap();
            builder.finish().unwrap();
        }

        let mut archive = tar::Archive::new(&buf[..]);
        let mut seen_sha1 = false;
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.path().unwrap().to_string_lossy() != "usr/bin/hello" {
                continue;
            }
            let pax = entry.pax_extensions().unwrap().expect("pax records");
            for record in pax {
                let record = record.unwrap();
                if record.key().unwrap() == "APK-TOOLS.checksum.SHA1" {
                    assert_eq!(
                        record.value().unwrap(),
                        "09fac8dbfd27bd9b4d23a00eb648aa751789536d"
                    );
                    seen_sha1 = true;
                }
            }
        }
        assert!(seen_sha1);
    }

    #[test]
    fn gz_header_mtime_is_zero() {
        let mut buf = Vec::new();
        {
            let mut gz = gz_writer(&mut buf);
            gz.write_all(b"payload").unwrap();
            gz.finish().unwrap();
        }
        // bytes 4..8 of a gzip header are the little-endian mtime
        assert_eq!(&buf[4..8], &[0, 0, 0, 0]);

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(&buf[..])
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "payload");
    }

    #[test]
    fn ar_members_keep_their_order() {
        let mut buf = Vec::new();
        {
            let mut builder = ar::Builder::new(&mut buf);
            ar_member_bytes(&mut builder, "debian-binary", b"2.0\n", 1).unwrap();
            ar_member_bytes(&mut builder, "second", b"xy", 1).unwrap();
        }
        let mut archive = ar::Archive::new(&buf[..]);
        let mut names = Vec::new();
        while let Some(entry) = archive.next_entry() {
            let entry = entry.unwrap();
            names.push(String::from_utf8_lossy(entry.header().identifier()).to_string());
        }
        assert_eq!(names, vec!["debian-binary", "second"]);
    }
}
