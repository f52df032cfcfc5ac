//! DEB writer.
//!
//! A `.deb` is an AR container with exactly three members in order:
//! `debian-binary`, `control.tar.zst`, `data.tar.zst`. The control archive
//! is produced from a transient `DEBIAN/` directory staged into the package
//! root and removed again before the data archive is taken.

use crate::archive::{self, TarOptions};
use crate::error::PackagingError;
use crate::manifest::{
    deb_maintainer_script, render_conffiles, BinaryDebControl, DebCopyright, Manifest,
};
use crate::package::{build_package_name, source_date_epoch, BuildTarget};
use crate::recipe::Recipe;
use crate::walk::{self, FileEntry, WalkOptions};
use crate::{ErrContext, Result};

use chrono::Utc;
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{info, trace};

pub(crate) fn build(recipe: &mut Recipe, output_dir: &Path) -> Result<PathBuf> {
    let package_name = build_package_name(recipe, BuildTarget::Deb)?;
    info!(package = %package_name, "building DEB package");

    let staging = recipe.dirs.package_dir.clone();
    let deb_dir = staging.join("DEBIAN");
    fs::create_dir_all(&deb_dir)
        .map_err(|e| PackagingError::fs("creating control directory", &deb_dir, e))?;

    let data_entries = walk::walk(
        &staging,
        &WalkOptions {
            skip_patterns: vec!["DEBIAN".to_string()],
            backup_files: walk::backup_set(&recipe.metadata.backup),
            ..Default::default()
        },
    )?;

    recipe.metadata.installed_size = walk::total_size(&data_entries);
    recipe.metadata.build_date = source_date_epoch();

    write_control_dir(recipe, &deb_dir)?;

    let scratch = tempfile::tempdir().context("failed to create scratch directory")?;

    trace!("producing control archive");
    let control_tar = scratch.path().join("control.tar.zst");
    let control_entries = walk::walk(&deb_dir, &WalkOptions::default())?;
    write_tar_zst(&control_tar, &control_entries)?;

    // the control directory must not leak into the data archive
    fs::remove_dir_all(&deb_dir)
        .map_err(|e| PackagingError::fs("removing control directory", &deb_dir, e))?;

    trace!("producing data archive");
    let data_tar = scratch.path().join("data.tar.zst");
    let mut all_data = vec![FileEntry::synthetic_dir("/")];
    all_data.extend(walk::walk(
        &staging,
        &WalkOptions {
            backup_files: walk::backup_set(&recipe.metadata.backup),
            ..Default::default()
        },
    )?);
    write_tar_zst(&data_tar, &all_data)?;

    let out_path = output_dir.join(&package_name);
    let out = File::create(&out_path)
        .map_err(|e| PackagingError::fs("creating package file", &out_path, e))?;
    let mut builder = ar::Builder::new(out);
    // AR member mtimes use wall clock; the one documented non-reproducible
    // field of this writer
    let now = Utc::now().timestamp().max(0) as u64;
    archive::ar_member_bytes(&mut builder, "debian-binary", b"2.0\n", now)?;
    archive::ar_member_file(&mut builder, "control.tar.zst", &control_tar, now)?;
    archive::ar_member_file(&mut builder, "data.tar.zst", &data_tar, now)?;

    Ok(out_path)
}

/// Populates `DEBIAN/` with the control file, copyright, conffiles,
/// maintainer scripts and debconf assets.
fn write_control_dir(recipe: &Recipe, deb_dir: &Path) -> Result<()> {
    let m = &recipe.metadata;

    let mut control = BinaryDebControl::from_recipe(recipe)?;
    control.installed_size = ((m.installed_size.max(0) as u64) + 1023) / 1024;
    control.save_to(deb_dir.join("control"))?;

    if !m.license.is_empty() {
        DebCopyright::from_recipe(recipe).save_to(deb_dir.join("copyright"))?;
    }

    if !m.backup.is_empty() {
        let path = deb_dir.join("conffiles");
        fs::write(&path, render_conffiles(&m.backup))
            .map_err(|e| PackagingError::fs("writing conffiles", &path, e))?;
    }

    let scripts = [
        ("preinst", &recipe.scriptlets.pre_install, false),
        ("postinst", &recipe.scriptlets.post_install, false),
        ("prerm", &recipe.scriptlets.pre_remove, true),
        ("postrm", &recipe.scriptlets.post_remove, true),
    ];
    for (name, body, guarded) in scripts {
        if body.is_empty() {
            continue;
        }
        let path = deb_dir.join(name);
        fs::write(&path, deb_maintainer_script(body, guarded))
            .map_err(|e| PackagingError::fs("writing maintainer script", &path, e))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .map_err(|e| PackagingError::fs("setting mode of", &path, e))?;
    }

    if !m.debconf_template.is_empty() {
        let path = deb_dir.join("templates");
        fs::write(&path, &m.debconf_template)
            .map_err(|e| PackagingError::fs("writing debconf templates", &path, e))?;
    }
    if !m.debconf_config.is_empty() {
        let path = deb_dir.join("config");
        fs::write(&path, &m.debconf_config)
            .map_err(|e| PackagingError::fs("writing debconf config", &path, e))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .map_err(|e| PackagingError::fs("setting mode of", &path, e))?;
    }

    Ok(())
}

fn write_tar_zst(path: &Path, entries: &[FileEntry]) -> Result<()> {
    let file =
        File::create(path).map_err(|e| PackagingError::fs("creating archive file", path, e))?;
    let zst = archive::zstd_writer(file)?;
    let mut builder = tar::Builder::new(zst);
    archive::append_entries(
        &mut builder,
        entries,
        &TarOptions {
            prefix: "./",
            ..Default::default()
        },
    )?;
    let zst = builder
        .into_inner()
        .context("failed to finish tar stream")?;
    zst.finish().context("failed to finish zstd stream")?;
    Ok(())
}
