//! Render-to-text builders for the per-format metadata files.

mod buildinfo;
mod control;
mod mtree;
mod pkgbuild;
mod pkginfo;
mod scripts;

pub use buildinfo::BuildInfo;
pub use control::{render_conffiles, BinaryDebControl, DebCopyright};
pub use mtree::render_mtree;
pub use pkgbuild::PkgBuild;
pub use pkginfo::{ApkPkgInfo, PacmanPkgInfo};
pub use scripts::{
    deb_maintainer_script, PacmanInstall, DEB_REMOVE_GUARD, RPM_REMOVE_GUARD,
};

use crate::error::PackagingError;
use crate::Result;

use std::fs;
use std::path::Path;

/// Name and version the generated files credit as their build tool.
pub const BUILD_TOOL: &str = "pkgforge";
pub const BUILD_TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A renderable metadata file.
pub trait Manifest {
    /// Renders this manifest to its textual form.
    fn render(&self) -> String;

    /// Renders this manifest and saves it to the given path.
    fn save_to(&self, path: impl AsRef<Path>) -> Result<()>
    where
        Self: Sized,
    {
        fs::write(&path, self.render())
            .map_err(|e| PackagingError::fs("writing manifest", path.as_ref(), e).into())
    }
}

/// Comma-space-joins entries, trimming each and dropping empties.
pub fn join<I, S>(entries: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Continues a multi-line value by prefixing every following line with a
/// space, the way control-style files wrap descriptions.
pub fn multiline(s: &str) -> String {
    s.replace('\n', "\n ")
}
