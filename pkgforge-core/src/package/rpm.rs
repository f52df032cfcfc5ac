//! RPM writer.
//!
//! Payload packaging (lead + signature + header + compressed cpio) is
//! delegated to the `rpm` encoder crate; this writer prepares the metadata,
//! relations, scriptlets and file set it feeds in.

use crate::error::PackagingError;
use crate::manifest::{join, RPM_REMOVE_GUARD};
use crate::package::{build_package_name, source_date_epoch, BuildTarget};
use crate::recipe::{Dependency, Recipe, VersionOp};
use crate::walk::{self, EntryKind, WalkOptions};
use crate::{ErrContext, Result};

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

pub(crate) fn build(recipe: &mut Recipe, output_dir: &Path) -> Result<PathBuf> {
    let package_name = build_package_name(recipe, BuildTarget::Rpm)?;
    info!(package = %package_name, "building RPM package");

    let staging = recipe.dirs.package_dir.clone();
    let entries = walk::walk(
        &staging,
        &WalkOptions {
            backup_files: walk::backup_set(&recipe.metadata.backup),
            ..Default::default()
        },
    )?;

    recipe.metadata.installed_size = walk::total_size(&entries);
    recipe.metadata.build_date = source_date_epoch();

    // RPM headers store times as uint32; a value outside that range is fatal
    let build_time = u32::try_from(recipe.metadata.build_date)
        .map_err(|_| PackagingError::Overflow(recipe.metadata.build_date))?;

    let m = &recipe.metadata;
    let arch = m.target_arch()?.rpm_name().to_string();
    let license = if m.license.is_empty() {
        "UNKNOWN".to_string()
    } else {
        join(&m.license)
    };
    let group = rpm_group(&m.section);
    debug!(group = %group, release = %m.rpm_release(), "rpm metadata prepared");

    let mut builder = rpm::PackageBuilder::new(
        &m.name,
        &m.version,
        &license,
        &arch,
        m.summary(),
    )
    .description(&m.description)
    .release(m.rpm_release())
    .compression(rpm::CompressionType::Zstd)
    .source_date(build_time);

    if !m.url.is_empty() {
        builder = builder.url(&m.url);
    }
    if !m.maintainer.is_empty() {
        builder = builder.vendor(&m.maintainer);
    }
    if let Some(epoch) = m.epoch_nonzero() {
        let epoch: u32 = epoch
            .parse()
            .with_context(|| format!("invalid epoch `{}`", epoch))?;
        builder = builder.epoch(epoch);
    }

    for dep in &m.depends {
        builder = builder.requires(rpm_dependency(dep));
    }
    for dep in &m.provides {
        builder = builder.provides(rpm_dependency(dep));
    }
    for dep in &m.replaces {
        builder = builder.obsoletes(rpm_dependency(dep));
    }
    for dep in &m.conflicts {
        builder = builder.conflicts(rpm_dependency(dep));
    }
    for dep in &m.optdepends {
        builder = builder
            .recommends(rpm_dependency(dep))
            .suggests(rpm_dependency(dep));
    }

    let s = &recipe.scriptlets;
    if !s.pre_install.is_empty() {
        builder = builder.pre_install_script(s.pre_install.clone());
    }
    if !s.post_install.is_empty() {
        builder = builder.post_install_script(s.post_install.clone());
    }
    if !s.pre_remove.is_empty() {
        builder =
            builder.pre_uninstall_script(format!("{}{}", RPM_REMOVE_GUARD, s.pre_remove));
    }
    if !s.post_remove.is_empty() {
        builder =
            builder.post_uninstall_script(format!("{}{}", RPM_REMOVE_GUARD, s.post_remove));
    }
    if !s.pre_trans.is_empty() {
        builder = builder.pre_trans_script(s.pre_trans.clone());
    }
    if !s.post_trans.is_empty() {
        builder = builder.post_trans_script(s.post_trans.clone());
    }

    for entry in &entries {
        // backup files install as config(noreplace)
        let entry = if entry.kind == EntryKind::Config {
            let mut normalized = entry.clone();
            normalized.kind = EntryKind::ConfigNoReplace;
            normalized
        } else {
            entry.clone()
        };

        let options = rpm::FileOptions::new(&entry.destination)
            .user("root")
            .group("root");
        let options = match entry.kind {
            EntryKind::Dir | EntryKind::ImplicitDir => {
                // the encoder derives parent directories on install
                trace!(entry = %entry.destination, "skipping directory entry");
                continue;
            }
            EntryKind::Symlink => {
                let target = entry.link_target.clone().unwrap_or_default();
                options.symlink(target)
            }
            EntryKind::ConfigNoReplace | EntryKind::Config => options
                .mode(rpm::FileMode::regular(entry.permissions() as u16))
                .is_config_noreplace(),
            EntryKind::File => {
                options.mode(rpm::FileMode::regular(entry.permissions() as u16))
            }
        };

        builder = builder
            .with_file(&entry.source, options)
            .map_err(|e| PackagingError::encoding(&entry.destination, "adding payload entry", e))?;
    }

    let package = builder
        .build()
        .map_err(|e| PackagingError::encoding(&package_name, "finalizing rpm", e))?;

    let out_path = output_dir.join(&package_name);
    let mut out = File::create(&out_path)
        .map_err(|e| PackagingError::fs("creating package file", &out_path, e))?;
    package
        .write(&mut out)
        .map_err(|e| PackagingError::encoding(&package_name, "writing package file", e))?;

    Ok(out_path)
}

fn rpm_dependency(expr: &str) -> rpm::Dependency {
    let dep = Dependency::parse(expr);
    match dep.constraint {
        Some((VersionOp::Lt, version)) => rpm::Dependency::less(dep.name, version),
        Some((VersionOp::Le, version)) => rpm::Dependency::less_eq(dep.name, version),
        Some((VersionOp::Eq, version)) => rpm::Dependency::eq(dep.name, version),
        Some((VersionOp::Ge, version)) => rpm::Dependency::greater_eq(dep.name, version),
        Some((VersionOp::Gt, version)) => rpm::Dependency::greater(dep.name, version),
        None => rpm::Dependency::any(dep.name),
    }
}

/// Maps the recipe `section` to the conventional RPM group.
fn rpm_group(section: &str) -> String {
    match section {
        "admin" => "Applications/System",
        "devel" => "Development/Tools",
        "doc" => "Documentation",
        "editors" => "Applications/Editors",
        "games" => "Amusements/Games",
        "graphics" => "Applications/Multimedia",
        "libs" => "System Environment/Libraries",
        "net" | "web" => "Applications/Internet",
        "sound" => "Applications/Multimedia",
        "text" => "Applications/Text",
        "utils" => "Applications/System",
        "" => "unknown",
        other => other,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dependency_relations_use_the_operator_form() {
        // the rendered expression round-trips through the engine's parser
        let dep = Dependency::parse("libssl>=1.1");
        assert_eq!(dep.rpm_format(), "libssl >= 1.1");
        let plain = Dependency::parse("zlib");
        assert_eq!(plain.rpm_format(), "zlib");
    }

    #[test]
    fn sections_map_through_the_group_table() {
        assert_eq!(rpm_group("utils"), "Applications/System");
        assert_eq!(rpm_group("libs"), "System Environment/Libraries");
        assert_eq!(rpm_group(""), "unknown");
        assert_eq!(rpm_group("custom/Group"), "custom/Group");
    }

    #[test]
    fn negative_build_dates_overflow() {
        assert!(u32::try_from(-1i64).is_err());
        assert!(u32::try_from(u32::MAX as i64 + 1).is_err());
    }
}
