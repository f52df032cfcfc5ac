mod directive;
mod expand;
pub mod metadata;
mod parser;
mod validate;

pub use metadata::{
    compute_architecture, is_valid_license, BuildArch, Dependency, DistroId, PackageFamily,
    PackageMetadata, VersionOp,
};
pub use parser::Parser;

use crate::{ErrContext, Result};

use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

lazy_static! {
    // process-wide override slots, set once by the orchestrator and read
    // once after parsing
    static ref OVERRIDE_PKGVER: RwLock<String> = RwLock::new(String::new());
    static ref OVERRIDE_PKGREL: RwLock<String> = RwLock::new(String::new());
}

/// Overrides the recipe `pkgver` for every subsequent parse. Wins
/// unconditionally when non-empty.
pub fn set_override_pkgver(version: impl Into<String>) {
    if let Ok(mut slot) = OVERRIDE_PKGVER.write() {
        *slot = version.into();
    }
}

/// Overrides the recipe `pkgrel` for every subsequent parse. Wins
/// unconditionally when non-empty.
pub fn set_override_pkgrel(release: impl Into<String>) {
    if let Ok(mut slot) = OVERRIDE_PKGREL.write() {
        *slot = release.into();
    }
}

/// Install-time scriptlets carried by the recipe. All may be empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scriptlets {
    pub pre_install: String,
    pub post_install: String,
    pub pre_remove: String,
    pub post_remove: String,
    pub pre_trans: String,
    pub post_trans: String,
}

impl Scriptlets {
    pub fn any(&self) -> bool {
        !(self.pre_install.is_empty()
            && self.post_install.is_empty()
            && self.pre_remove.is_empty()
            && self.post_remove.is_empty()
            && self.pre_trans.is_empty()
            && self.post_trans.is_empty())
    }
}

/// Raw shell bodies of the build functions. Opaque to the engine; an
/// external shell runs them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Functions {
    pub prepare: String,
    pub build: String,
    pub package: String,
}

/// The directories a build works in. `package_dir` is the staging root that
/// becomes `/` inside the built package.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildDirs {
    pub start_dir: PathBuf,
    pub home: PathBuf,
    pub source_dir: PathBuf,
    pub package_dir: PathBuf,
}

impl BuildDirs {
    /// The makepkg-style defaults relative to the recipe location.
    pub fn for_recipe(recipe_path: &Path) -> Self {
        let start_dir = recipe_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            home: start_dir.clone(),
            source_dir: start_dir.join("src"),
            package_dir: start_dir.join("pkg"),
            start_dir,
        }
    }
}

/// A parsed and validated recipe. Frozen once a writer starts; only the
/// computed metadata fields (`installed_size`, `build_date`, `data_hash`,
/// `checksum`) are stamped during packaging.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recipe {
    pub metadata: PackageMetadata,
    pub scriptlets: Scriptlets,
    pub functions: Functions,
    pub dirs: BuildDirs,
}

impl Recipe {
    /// Parses, applies the override slots and validates the recipe at
    /// `path` for the given build identity.
    pub fn load(path: &Path, distro: DistroId, target_arch: BuildArch) -> Result<Self> {
        debug!(recipe = %path.display(), "loading recipe");
        let mut recipe = Parser::new(distro, target_arch)
            .parse_file(path)
            .with_context(|| format!("failed to parse recipe `{}`", path.display()))?;
        recipe.dirs = BuildDirs::for_recipe(path);
        recipe.apply_overrides();
        validate::validate(&recipe)?;
        Ok(recipe)
    }

    fn apply_overrides(&mut self) {
        if let Ok(version) = OVERRIDE_PKGVER.read() {
            if !version.is_empty() {
                self.metadata.version = version.clone();
            }
        }
        if let Ok(release) = OVERRIDE_PKGREL.read() {
            if !release.is_empty() {
                self.metadata.release = release.clone();
            }
        }
    }

    /// Resolves `arch_computed` for the target architecture. Invoked by the
    /// orchestrator before a writer runs.
    pub fn compute_architecture(&mut self, target: BuildArch) -> Result<()> {
        let computed = compute_architecture(&self.metadata.arch, target)?;
        self.metadata.arch_computed = Some(computed);
        Ok(())
    }
}
