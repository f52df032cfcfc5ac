//! Pacman writer.
//!
//! A `.pkg.tar.zst` is a zstd-compressed tar carrying `.PKGINFO`,
//! `.BUILDINFO`, `.MTREE` (a gzip-compressed mtree body) and, when the
//! recipe has scriptlets, `{pkgname}.install`, followed by the staged file
//! payload. Dotfiles in the staging tree never enter the package; the
//! control members are re-added explicitly.

use crate::archive::{self, TarOptions};
use crate::digest;
use crate::error::PackagingError;
use crate::manifest::{
    render_mtree, BuildInfo, Manifest, PacmanInstall, PacmanPkgInfo, PkgBuild,
};
use crate::package::{build_package_name, source_date_epoch, BuildTarget};
use crate::recipe::Recipe;
use crate::walk::{self, FileEntry, WalkOptions};
use crate::{ErrContext, Result};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, trace};

pub(crate) fn build(recipe: &mut Recipe, output_dir: &Path) -> Result<PathBuf> {
    let package_name = build_package_name(recipe, BuildTarget::Pkg)?;
    info!(package = %package_name, "building PKG package");

    let staging = recipe.dirs.package_dir.clone();
    let walk_options = WalkOptions {
        skip_dot_files: true,
        backup_files: walk::backup_set(&recipe.metadata.backup),
        ..Default::default()
    };

    let data_entries = walk::walk(&staging, &walk_options)?;
    recipe.metadata.installed_size = walk::total_size(&data_entries);
    recipe.metadata.build_date = source_date_epoch();

    let pkg_dest = absolute(output_dir)?;

    // the PKGBUILD the package was built from, with its checksum recorded
    // for .BUILDINFO
    let pkgbuild = PkgBuild::from_recipe(recipe).render();
    if recipe.dirs.home != recipe.dirs.start_dir {
        let path = recipe.dirs.start_dir.join("PKGBUILD");
        fs::write(&path, &pkgbuild)
            .map_err(|e| PackagingError::fs("writing PKGBUILD", &path, e))?;
    }
    recipe.metadata.checksum = digest::sha256_bytes(pkgbuild.as_bytes());

    PacmanPkgInfo::from_recipe(recipe)?.save_to(staging.join(".PKGINFO"))?;
    BuildInfo::from_recipe(recipe)?.save_to(staging.join(".BUILDINFO"))?;

    trace!("producing .MTREE");
    let mtree_path = staging.join(".MTREE");
    {
        let file = File::create(&mtree_path)
            .map_err(|e| PackagingError::fs("creating .MTREE", &mtree_path, e))?;
        let mut gz = archive::gz_writer(file);
        gz.write_all(render_mtree(&data_entries).as_bytes())
            .and_then(|_| gz.finish().map(|_| ()))
            .map_err(|e| PackagingError::fs("writing .MTREE", &mtree_path, e))?;
    }

    let install_name = format!("{}.install", recipe.metadata.name);
    let install_path = if recipe.scriptlets.any() {
        let path = recipe.dirs.start_dir.join(&install_name);
        fs::write(&path, PacmanInstall::from(&recipe.scriptlets).render())
            .map_err(|e| PackagingError::fs("writing install script", &path, e))?;
        Some(path)
    } else {
        None
    };

    trace!("producing package archive");
    let mut control_entries = vec![
        FileEntry::from_path(&staging.join(".PKGINFO"), "/.PKGINFO")?,
        FileEntry::from_path(&staging.join(".BUILDINFO"), "/.BUILDINFO")?,
        FileEntry::from_path(&mtree_path, "/.MTREE")?,
    ];
    if let Some(path) = &install_path {
        control_entries.push(FileEntry::from_path(path, format!("/{}", install_name))?);
    }

    let out_path = pkg_dest.join(&package_name);
    let out = File::create(&out_path)
        .map_err(|e| PackagingError::fs("creating package file", &out_path, e))?;
    let zst = archive::zstd_writer(out)?;
    let mut builder = tar::Builder::new(zst);
    archive::append_entries(&mut builder, &control_entries, &TarOptions::default())?;
    archive::append_entries(&mut builder, &data_entries, &TarOptions::default())?;
    let zst = builder
        .into_inner()
        .context("failed to finish tar stream")?;
    zst.finish().context("failed to finish zstd stream")?;

    Ok(out_path)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .context("failed to resolve the output directory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{BuildArch, DistroId};
    use pretty_assertions::assert_eq;
    use std::io::Read;

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
        recipe.metadata.distro = DistroId::new("arch", "");
        recipe.functions.package = ":".into();
        recipe.dirs.package_dir = staging;
        recipe.dirs.start_dir = dir.to_path_buf();
        recipe.dirs.home = dir.to_path_buf();
        recipe.dirs.source_dir = dir.join("src");
        recipe.compute_architecture(BuildArch::x86_64).unwrap();
        recipe
    }

    #[test]
    fn control_members_lead_the_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut recipe = staged_recipe(dir.path());
        recipe.scriptlets.post_install = "    echo done".into();

        let out = build(&mut recipe, dir.path()).unwrap();
        assert_eq!(
            out.file_name().unwrap().to_str().unwrap(),
            "hello-1.0.0-1-x86_64.pkg.tar.zst"
        );

        let file = File::open(&out).unwrap();
        let mut archive =
            tar::Archive::new(zstd::stream::read::Decoder::new(file).unwrap());
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            &names[..4],
            &[
                ".PKGINFO".to_string(),
                ".BUILDINFO".to_string(),
                ".MTREE".to_string(),
                "hello.install".to_string(),
            ]
        );
        assert!(names.contains(&"usr/bin/hello".to_string()));
    }

    #[test]
    fn checksum_matches_the_rendered_pkgbuild() {
        let dir = tempfile::tempdir().unwrap();
        let mut recipe = staged_recipe(dir.path());
        build(&mut recipe, dir.path()).unwrap();

        let rendered = PkgBuild::from_recipe(&recipe).render();
        assert_eq!(
            recipe.metadata.checksum,
            digest::sha256_bytes(rendered.as_bytes())
        );
        assert_eq!(recipe.metadata.checksum.len(), 64);
    }

    #[test]
    fn mtree_is_a_gzip_of_the_data_walk() {
        let dir = tempfile::tempdir().unwrap();
        let mut recipe = staged_recipe(dir.path());
        fs::write(
            recipe.dirs.package_dir.join("usr/bin/.hidden"),
            b"secret",
        )
        .unwrap();

        let out = build(&mut recipe, dir.path()).unwrap();

        let file = File::open(&out).unwrap();
        let mut archive =
            tar::Archive::new(zstd::stream::read::Decoder::new(file).unwrap());
        let mut mtree = String::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.path().unwrap().to_string_lossy() == ".MTREE" {
                let mut bytes = Vec::new();
                entry.read_to_end(&mut bytes).unwrap();
                flate2::read::GzDecoder::new(&bytes[..])
                    .read_to_string(&mut mtree)
                    .unwrap();
            }
        }
        assert!(mtree.contains("./usr/bin/hello"));
        assert!(!mtree.contains(".hidden"));
        assert!(!mtree.contains(".PKGINFO"));
    }
}
