use crate::walk::{EntryKind, FileEntry};

use std::fmt::Write;

/// Renders the mtree text body for `.MTREE`: one line per walked entry with
/// path, mode, size, checksum for files and link target for symlinks. All
/// times are pinned to zero.
pub fn render_mtree(entries: &[FileEntry]) -> String {
    let mut out = String::from("#mtree\n/set type=file uid=0 gid=0 mode=644 time=0.0\n");

    for entry in entries {
        let path = format!("./{}", entry.destination.trim_start_matches('/'));
        match entry.kind {
            EntryKind::Dir | EntryKind::ImplicitDir => {
                let _ = writeln!(
                    out,
                    "{} time=0.0 mode={:o} type=dir",
                    path,
                    entry.permissions()
                );
            }
            EntryKind::Symlink => {
                let _ = writeln!(
                    out,
                    "{} time=0.0 mode=777 type=link link={}",
                    path,
                    entry.link_target.as_deref().unwrap_or_default()
                );
            }
            EntryKind::File | EntryKind::Config | EntryKind::ConfigNoReplace => {
                let _ = writeln!(
                    out,
                    "{} time=0.0 mode={:o} size={} sha256digest={}",
                    path,
                    entry.permissions(),
                    entry.size,
                    entry.sha256.as_deref().unwrap_or_default()
                );
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::{walk, WalkOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_entries_in_walk_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("usr/bin")).unwrap();
        std::fs::write(dir.path().join("usr/bin/hello"), b"Hello, world!\n").unwrap();
        std::os::unix::fs::symlink("hello", dir.path().join("usr/bin/hi")).unwrap();

        let entries = walk(dir.path(), &WalkOptions::default()).unwrap();
        let out = render_mtree(&entries);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "#mtree");
        assert_eq!(lines[1], "/set type=file uid=0 gid=0 mode=644 time=0.0");
        assert!(lines[2].starts_with("./usr time=0.0 mode=") && lines[2].ends_with("type=dir"));
        assert!(lines[4].starts_with("./usr/bin/hello time=0.0 mode="));
        assert!(lines[4].contains("size=14"));
        assert!(lines[4].contains(&format!(
            "sha256digest={}",
            crate::digest::sha256_bytes(b"Hello, world!\n")
        )));
        assert!(lines[5].contains("type=link link=hello"));
    }
}
