//! Deterministic staging-directory walker.
//!
//! Entries come out in lexicographic order per directory level, depth first,
//! and that order is preserved all the way into the archives. The walk never
//! follows symlinks and never reads link content.

use crate::digest;
use crate::error::PackagingError;
use crate::{ErrContext, Result};

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What a staged path becomes inside a package.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// A directory synthesized by a writer rather than found on disk.
    ImplicitDir,
    Symlink,
    /// A file listed in the recipe `backup` array.
    Config,
    /// A config file the package manager must not overwrite; produced by the
    /// RPM writer when it normalizes `Config` entries.
    ConfigNoReplace,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Dir | EntryKind::ImplicitDir)
    }

    pub fn is_file(self) -> bool {
        matches!(
            self,
            EntryKind::File | EntryKind::Config | EntryKind::ConfigNoReplace
        )
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::File => "file",
            EntryKind::Dir => "dir",
            EntryKind::ImplicitDir => "implicit_dir",
            EntryKind::Symlink => "symlink",
            EntryKind::Config => "config",
            EntryKind::ConfigNoReplace => "config_noreplace",
        };
        f.write_str(name)
    }
}

/// A single staged filesystem object in package terms.
#[derive(Clone, Debug)]
pub struct FileEntry {
    /// Absolute path of the staged object on disk.
    pub source: PathBuf,
    /// Package-relative destination, always starting with `/`.
    pub destination: String,
    pub kind: EntryKind,
    /// Raw `st_mode` (permissions plus type bits) captured before any
    /// ownership normalization.
    pub mode: u32,
    pub size: u64,
    pub mod_time: i64,
    pub link_target: Option<String>,
    pub sha256: Option<String>,
    pub is_backup: bool,
}

impl FileEntry {
    /// Builds an entry for a single on-disk file, the way the walker would.
    pub fn from_path(source: &Path, destination: impl Into<String>) -> Result<Self> {
        let meta = fs::symlink_metadata(source)
            .map_err(|e| PackagingError::fs("reading metadata of", source, e))?;
        let destination = destination.into();
        let kind = if meta.file_type().is_dir() {
            EntryKind::Dir
        } else if meta.file_type().is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::File
        };
        let link_target = if kind == EntryKind::Symlink {
            let target = fs::read_link(source)
                .map_err(|e| PackagingError::fs("reading link target of", source, e))?;
            Some(target.to_string_lossy().to_string())
        } else {
            None
        };
        let sha256 = if kind == EntryKind::File {
            Some(digest::sha256_file(source)?)
        } else {
            None
        };
        Ok(Self {
            source: source.to_path_buf(),
            destination,
            kind,
            mode: meta.mode(),
            size: if kind == EntryKind::File { meta.len() } else { 0 },
            mod_time: meta.mtime(),
            link_target,
            sha256,
            is_backup: false,
        })
    }

    /// A directory entry a writer injects without a backing walk.
    pub fn synthetic_dir(destination: impl Into<String>) -> Self {
        Self {
            source: PathBuf::new(),
            destination: destination.into(),
            kind: EntryKind::ImplicitDir,
            mode: 0o040755,
            size: 0,
            mod_time: 0,
            link_target: None,
            sha256: None,
            is_backup: false,
        }
    }

    /// Permission bits without the file type.
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// Options steering a walk.
#[derive(Clone, Debug, Default)]
pub struct WalkOptions {
    /// Drop every entry whose basename starts with a dot.
    pub skip_dot_files: bool,
    /// Absolute destinations listed in the recipe `backup` array.
    pub backup_files: BTreeSet<String>,
    /// Shell globs matched against basenames; matches are pruned.
    pub skip_patterns: Vec<String>,
}

impl WalkOptions {
    pub fn with_backup(backup: &[String]) -> Self {
        Self {
            backup_files: backup_set(backup),
            ..Default::default()
        }
    }
}

/// Normalizes recipe backup paths to absolute destinations, dropping
/// duplicates.
pub fn backup_set(backup: &[String]) -> BTreeSet<String> {
    backup
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with('/') {
                p.clone()
            } else {
                format!("/{}", p)
            }
        })
        .collect()
}

/// Walks `root` and produces the ordered entry list. The root itself is not
/// emitted; empty directories are.
pub fn walk(root: &Path, options: &WalkOptions) -> Result<Vec<FileEntry>> {
    let patterns = options
        .skip_patterns
        .iter()
        .map(|p| glob::Pattern::new(p))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid skip pattern")?;

    let mut entries = Vec::new();
    let iter = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            if options.skip_dot_files && name.starts_with('.') {
                return false;
            }
            !patterns.iter().any(|p| p.matches(&name))
        });

    for entry in iter {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            match e.into_io_error() {
                Some(io) => PackagingError::fs("walking", path, io),
                None => PackagingError::fs(
                    "walking",
                    path,
                    std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"),
                ),
            }
        })?;

        let rel = entry
            .path()
            .strip_prefix(root)
            .context("walked entry escapes the root")?;
        let destination = format!("/{}", rel.to_string_lossy());

        let meta = entry.metadata().map_err(|e| {
            PackagingError::fs(
                "reading metadata of",
                entry.path(),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "stat")),
            )
        })?;

        let is_backup = options.backup_files.contains(&destination);
        let file_type = entry.file_type();

        let (kind, size, link_target, sha256) = if file_type.is_dir() {
            (EntryKind::Dir, 0, None, None)
        } else if file_type.is_symlink() {
            let target = fs::read_link(entry.path())
                .map_err(|e| PackagingError::fs("reading link target of", entry.path(), e))?;
            (
                EntryKind::Symlink,
                0,
                Some(target.to_string_lossy().to_string()),
                None,
            )
        } else {
            let kind = if is_backup {
                EntryKind::Config
            } else {
                EntryKind::File
            };
            (
                kind,
                meta.len(),
                None,
                Some(digest::sha256_file(entry.path())?),
            )
        };

        entries.push(FileEntry {
            source: entry.path().to_path_buf(),
            destination,
            kind,
            mode: meta.mode(),
            size,
            mod_time: meta.mtime(),
            link_target,
            sha256,
            is_backup,
        });
    }

    Ok(entries)
}

/// Total size of the regular files in `entries`.
pub fn total_size(entries: &[FileEntry]) -> i64 {
    entries
        .iter()
        .filter(|e| e.kind.is_file())
        .map(|e| e.size as i64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::io::Write;
    use std::os::unix::fs::{symlink, PermissionsExt};

    fn stage() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("usr/bin")).unwrap();
        fs::create_dir_all(root.join("etc")).unwrap();
        fs::create_dir_all(root.join("var/empty")).unwrap();

        let mut f = File::create(root.join("usr/bin/hello")).unwrap();
        f.write_all(b"Hello, world!\n").unwrap();
        fs::set_permissions(
            root.join("usr/bin/hello"),
            fs::Permissions::from_mode(0o755),
        )
        .unwrap();

        fs::write(root.join("etc/app.conf"), b"key=value\n").unwrap();
        fs::write(root.join("usr/bin/.hidden"), b"x").unwrap();
        symlink("hello", root.join("usr/bin/hi")).unwrap();
        dir
    }

    fn destinations(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.destination.as_str()).collect()
    }

    #[test]
    fn walk_is_ordered_and_complete() {
        let dir = stage();
        let entries = walk(dir.path(), &WalkOptions::default()).unwrap();
        assert_eq!(
            destinations(&entries),
            vec![
                "/etc",
                "/etc/app.conf",
                "/usr",
                "/usr/bin",
                "/usr/bin/.hidden",
                "/usr/bin/hello",
                "/usr/bin/hi",
                "/var",
                "/var/empty",
            ]
        );
    }

    #[test]
    fn two_walks_are_identical() {
        let dir = stage();
        let a = walk(dir.path(), &WalkOptions::default()).unwrap();
        let b = walk(dir.path(), &WalkOptions::default()).unwrap();
        let key = |entries: &[FileEntry]| {
            entries
                .iter()
                .map(|e| {
                    (
                        e.destination.clone(),
                        e.mode,
                        e.size,
                        e.link_target.clone(),
                        e.sha256.clone(),
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(key(&a), key(&b));
    }

    #[test]
    fn skips_dot_files_when_asked() {
        let dir = stage();
        let entries = walk(
            dir.path(),
            &WalkOptions {
                skip_dot_files: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!destinations(&entries).contains(&"/usr/bin/.hidden"));
        assert!(destinations(&entries).contains(&"/usr/bin/hello"));
    }

    #[test]
    fn skip_patterns_match_basenames() {
        let dir = stage();
        let entries = walk(
            dir.path(),
            &WalkOptions {
                skip_patterns: vec![".*".to_string(), "*.conf".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
        let names = destinations(&entries);
        assert!(!names.contains(&"/usr/bin/.hidden"));
        assert!(!names.contains(&"/etc/app.conf"));
        assert!(names.contains(&"/etc"));
    }

    #[test]
    fn files_carry_hashes_and_symlinks_carry_targets() {
        let dir = stage();
        let entries = walk(dir.path(), &WalkOptions::default()).unwrap();

        let hello = entries
            .iter()
            .find(|e| e.destination == "/usr/bin/hello")
            .unwrap();
        assert_eq!(hello.kind, EntryKind::File);
        assert_eq!(hello.permissions(), 0o755);
        assert_eq!(hello.size, 14);
        assert_eq!(
            hello.sha256.as_deref().unwrap(),
            crate::digest::sha256_bytes(b"Hello, world!\n")
        );

        let link = entries
            .iter()
            .find(|e| e.destination == "/usr/bin/hi")
            .unwrap();
        assert_eq!(link.kind, EntryKind::Symlink);
        assert_eq!(link.link_target.as_deref(), Some("hello"));
        assert!(link.sha256.is_none());

        let empty = entries
            .iter()
            .find(|e| e.destination == "/var/empty")
            .unwrap();
        assert_eq!(empty.kind, EntryKind::Dir);
    }

    #[test]
    fn backup_destinations_are_marked_once() {
        let dir = stage();
        let backup = vec!["etc/app.conf".to_string(), "/etc/app.conf".to_string()];
        let set = backup_set(&backup);
        assert_eq!(set.len(), 1);

        let entries = walk(
            dir.path(),
            &WalkOptions {
                backup_files: set,
                ..Default::default()
            },
        )
        .unwrap();
        let conf = entries
            .iter()
            .find(|e| e.destination == "/etc/app.conf")
            .unwrap();
        assert!(conf.is_backup);
        assert_eq!(conf.kind, EntryKind::Config);
    }
}
