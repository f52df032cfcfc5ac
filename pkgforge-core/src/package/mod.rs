//! Package orchestration: writer selection, naming discipline and
//! architecture translation. Internal code never branches on the format
//! after the dispatch below.

pub mod apk;
pub mod deb;
pub mod pkg;
pub mod rpm;

use crate::recipe::{BuildArch, PackageFamily, Recipe};
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, info_span};

/// The target package format.
#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    Apk,
    Deb,
    Rpm,
    Pkg,
}

impl TryFrom<&str> for BuildTarget {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "apk" => Ok(Self::Apk),
            "deb" => Ok(Self::Deb),
            "rpm" => Ok(Self::Rpm),
            "pkg" => Ok(Self::Pkg),
            target => Err(anyhow!("unknown package target `{}`", target)),
        }
    }
}

impl AsRef<str> for BuildTarget {
    fn as_ref(&self) -> &str {
        match self {
            Self::Apk => "apk",
            Self::Deb => "deb",
            Self::Rpm => "rpm",
            Self::Pkg => "pkg",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl BuildTarget {
    /// The format a distribution family natively installs.
    pub fn for_family(family: PackageFamily) -> Option<Self> {
        match family {
            PackageFamily::Alpine => Some(Self::Apk),
            PackageFamily::Debian => Some(Self::Deb),
            PackageFamily::RedHat => Some(Self::Rpm),
            PackageFamily::Arch => Some(Self::Pkg),
            PackageFamily::Unknown => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Apk => "apk",
            Self::Deb => "deb",
            Self::Rpm => "rpm",
            Self::Pkg => "pkg.tar.zst",
        }
    }
}

/// The build timestamp stamped into package metadata. Honors
/// `SOURCE_DATE_EPOCH` when set, and pins to the epoch otherwise so repeated
/// builds of the same staging tree emit identical archives. The DEB AR
/// member mtime is the one field that keeps wall-clock time.
pub fn source_date_epoch() -> i64 {
    std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// The file name a package is emitted under, per format convention. The
/// architecture is translated to the format's synonym here and nowhere
/// earlier.
pub fn build_package_name(recipe: &Recipe, target: BuildTarget) -> Result<String> {
    let m = &recipe.metadata;
    let arch = m.target_arch()?;
    let name = match target {
        BuildTarget::Apk => format!(
            "{}-{}-{}.{}.apk",
            m.name,
            m.version,
            m.release,
            arch.apk_name()
        ),
        BuildTarget::Deb => format!(
            "{}_{}-{}_{}.deb",
            m.name,
            m.version,
            m.release,
            arch.deb_name()
        ),
        BuildTarget::Rpm => {
            let epoch = m
                .epoch_nonzero()
                .map(|e| format!("{}:", e))
                .unwrap_or_default();
            format!(
                "{}-{}{}-{}.{}.rpm",
                m.name,
                epoch,
                m.version,
                m.rpm_release(),
                arch.rpm_name()
            )
        }
        BuildTarget::Pkg => {
            let epoch = m
                .epoch_nonzero()
                .map(|e| format!("{}:", e))
                .unwrap_or_default();
            format!(
                "{}-{}{}-{}-{}.pkg.tar.zst",
                m.name,
                epoch,
                m.version,
                m.release,
                arch.pkg_name()
            )
        }
    };
    Ok(name)
}

/// Builds the package for `target` from the recipe's staged `package_dir`
/// into `output_dir` and returns the emitted path. Resolves the build
/// architecture first; the recipe is frozen apart from the computed fields
/// the writer stamps.
pub fn create_package(
    recipe: &mut Recipe,
    target: BuildTarget,
    target_arch: BuildArch,
    output_dir: &Path,
) -> Result<PathBuf> {
    recipe.compute_architecture(target_arch)?;

    let span = info_span!("package", name = %recipe.metadata.name, target = %target);
    let _enter = span.enter();

    let path = match target {
        BuildTarget::Apk => apk::build(recipe, output_dir),
        BuildTarget::Deb => deb::build(recipe, output_dir),
        BuildTarget::Rpm => rpm::build(recipe, output_dir),
        BuildTarget::Pkg => pkg::build(recipe, output_dir),
    }?;

    info!(package = %path.display(), "created package");
    Ok(path)
}
