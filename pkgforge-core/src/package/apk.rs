//! APK writer.
//!
//! An `.apk` is the byte concatenation of `control.tar.gz` and
//! `data.tar.gz`. `.PKGINFO` lives in the control segment but carries the
//! SHA-256 of the data segment, so construction is strictly two-pass: the
//! data archive is produced and hashed first, `.PKGINFO` is re-rendered with
//! the hash, and only then is the control archive produced.

use crate::archive::{self, TarOptions};
use crate::digest;
use crate::error::PackagingError;
use crate::manifest::{ApkPkgInfo, Manifest};
use crate::package::{build_package_name, source_date_epoch, BuildTarget};
use crate::recipe::Recipe;
use crate::walk::{self, WalkOptions};
use crate::{ErrContext, Result};

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Basename prefixes that belong to the control segment.
const CONTROL_PREFIXES: &[&str] = &[".PKGINFO", ".SIGN", ".pre-", ".post-", ".install", ".trigger"];

pub(crate) fn build(recipe: &mut Recipe, output_dir: &Path) -> Result<PathBuf> {
    let package_name = build_package_name(recipe, BuildTarget::Apk)?;
    info!(package = %package_name, "building APK package");

    let staging = recipe.dirs.package_dir.clone();
    write_scriptlet_files(recipe, &staging)?;

    // data file set: everything except the dot-prefixed control files
    trace!("walking data file set");
    let data_entries = walk::walk(
        &staging,
        &WalkOptions {
            skip_patterns: vec![".*".to_string()],
            backup_files: walk::backup_set(&recipe.metadata.backup),
            ..Default::default()
        },
    )?;

    recipe.metadata.installed_size = walk::total_size(&data_entries);
    recipe.metadata.build_date = source_date_epoch();

    trace!("producing data segment");
    let mut data_segment = Vec::new();
    {
        let gz = archive::gz_writer(&mut data_segment);
        let mut builder = tar::Builder::new(gz);
        archive::append_entries(
            &mut builder,
            &data_entries,
            &TarOptions {
                pax_times: true,
                sha1_records: true,
                prefix: "",
            },
        )?;
        let gz = builder
            .into_inner()
            .context("failed to finish data tar stream")?;
        gz.finish().context("failed to finish data gzip stream")?;
    }

    recipe.metadata.data_hash = digest::sha256_bytes(&data_segment);
    debug!(datahash = %recipe.metadata.data_hash, "data segment hashed");

    // re-render .PKGINFO now that the datahash is known
    ApkPkgInfo::from_recipe(recipe)?.save_to(staging.join(".PKGINFO"))?;

    trace!("walking control file set");
    let control_entries: Vec<_> = walk::walk(&staging, &WalkOptions::default())?
        .into_iter()
        .filter(|e| {
            let relative = e.destination.trim_start_matches('/');
            !relative.contains('/') && CONTROL_PREFIXES.iter().any(|p| relative.starts_with(p))
        })
        .collect();

    trace!("producing control segment");
    let mut control_segment = Vec::new();
    {
        let gz = archive::gz_writer(&mut control_segment);
        let mut builder = tar::Builder::new(gz);
        archive::append_entries(
            &mut builder,
            &control_entries,
            &TarOptions {
                pax_times: true,
                sha1_records: false,
                prefix: "",
            },
        )?;
        let gz = builder
            .into_inner()
            .context("failed to finish control tar stream")?;
        gz.finish().context("failed to finish control gzip stream")?;
    }

    let out_path = output_dir.join(&package_name);
    let mut out = File::create(&out_path)
        .map_err(|e| PackagingError::fs("creating package file", &out_path, e))?;
    out.write_all(&control_segment)
        .and_then(|_| out.write_all(&data_segment))
        .map_err(|e| PackagingError::fs("writing package file", &out_path, e))?;

    Ok(out_path)
}

/// Renders the recipe scriptlets as APK control files in the staging root.
/// They are dot-prefixed, so the data walk never picks them up.
fn write_scriptlet_files(recipe: &Recipe, staging: &Path) -> Result<()> {
    let scripts = [
        (".pre-install", &recipe.scriptlets.pre_install),
        (".post-install", &recipe.scriptlets.post_install),
        (".pre-deinstall", &recipe.scriptlets.pre_remove),
        (".post-deinstall", &recipe.scriptlets.post_remove),
    ];
    for (name, body) in scripts {
        if body.is_empty() {
            continue;
        }
        let path = staging.join(name);
        let script = format!("#!/bin/sh\n{}\n", body);
        fs::write(&path, script).map_err(|e| PackagingError::fs("writing scriptlet", &path, e))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .map_err(|e| PackagingError::fs("setting mode of", &path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{BuildArch, DistroId};
    use pretty_assertions::assert_eq;

    fn staged_recipe(dir: &Path) -> Recipe {
        let staging = dir.join("pkg");
        fs::create_dir_all(staging.join("usr/bin")).unwrap();
        fs::write(staging.join("usr/bin/hello"), b"Hello, world!\n").unwrap();

        let mut recipe = Recipe::default();
        recipe.metadata.name = "hello".into();
        recipe.metadata.version = "1.0.0".into();
        recipe.metadata.release = "1".into();
        recipe.metadata.description = "greeter".into();
        recipe.metadata.maintainer = "a@b".into();
        recipe.metadata.license = vec!["MIT".into()];
        recipe.metadata.arch = vec![BuildArch::x86_64];
        recipe.metadata.distro = DistroId::new("alpine", "");
        recipe.functions.package = ":".into();
        recipe.dirs.package_dir = staging;
        recipe.dirs.start_dir = dir.to_path_buf();
        recipe.compute_architecture(BuildArch::x86_64).unwrap();
        recipe
    }

    #[test]
    fn control_files_never_reach_the_data_segment() {
        let dir = tempfile::tempdir().unwrap();
        let mut recipe = staged_recipe(dir.path());
        recipe.scriptlets.post_install = "echo hi".into();

        let out = build(&mut recipe, dir.path()).unwrap();
        assert_eq!(
            out.file_name().unwrap().to_str().unwrap(),
            "hello-1.0.0-1.x86_64.apk"
        );

        // the first gzip member is the control segment
        let bytes = fs::read(&out).unwrap();
        let mut control = tar::Archive::new(flate2::read::GzDecoder::new(&bytes[..]));
        let names: Vec<String> = control
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&".PKGINFO".to_string()));
        assert!(names.contains(&".post-install".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("usr")));
    }
}
