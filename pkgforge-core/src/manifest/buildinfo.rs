use crate::manifest::{Manifest, BUILD_TOOL, BUILD_TOOL_VERSION};
use crate::recipe::Recipe;
use crate::Result;

/// The `.BUILDINFO` file at the root of a Pacman package (format 2).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildInfo {
    pub pkgname: String,
    pub pkgbase: String,
    /// `[epoch:]version-pkgrel`.
    pub pkgver: String,
    pub pkgarch: String,
    /// Hex SHA-256 of the rendered PKGBUILD.
    pub pkgbuild_sha256sum: String,
    pub packager: String,
    pub builddate: i64,
    pub builddir: String,
    pub startdir: String,
    pub buildtool: String,
    pub buildtoolver: String,
    pub buildenv: Vec<String>,
    pub options: Vec<String>,
    pub installed: Vec<String>,
}

impl BuildInfo {
    pub fn from_recipe(recipe: &Recipe) -> Result<Self> {
        let m = &recipe.metadata;
        let mut options = Vec::new();
        if !m.strip_enabled {
            options.push("!strip".to_string());
        }
        if !m.static_enabled {
            options.push("!staticlibs".to_string());
        }
        Ok(Self {
            pkgname: m.name.clone(),
            pkgbase: m.name.clone(),
            pkgver: m.pacman_pkgver(),
            pkgarch: m.target_arch()?.pkg_name().to_string(),
            pkgbuild_sha256sum: m.checksum.clone(),
            packager: m.maintainer.clone(),
            builddate: m.build_date,
            builddir: recipe.dirs.source_dir.display().to_string(),
            startdir: recipe.dirs.start_dir.display().to_string(),
            buildtool: BUILD_TOOL.to_string(),
            buildtoolver: BUILD_TOOL_VERSION.to_string(),
            buildenv: Vec::new(),
            options,
            installed: Vec::new(),
        })
    }
}

impl Manifest for BuildInfo {
    fn render(&self) -> String {
        let mut out = String::new();
        let mut kv = |key: &str, value: &str| {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        };

        kv("format", "2");
        kv("pkgname", &self.pkgname);
        kv("pkgbase", &self.pkgbase);
        kv("pkgver", &self.pkgver);
        kv("pkgarch", &self.pkgarch);
        kv("pkgbuild_sha256sum", &self.pkgbuild_sha256sum);
        kv("packager", &self.packager);
        kv("builddate", &self.builddate.to_string());
        kv("builddir", &self.builddir);
        kv("startdir", &self.startdir);
        kv("buildtool", &self.buildtool);
        kv("buildtoolver", &self.buildtoolver);
        for env in &self.buildenv {
            kv("buildenv", env);
        }
        for option in &self.options {
            kv("options", option);
        }
        for installed in &self.installed {
            kv("installed", installed);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_format_2() {
        let info = BuildInfo {
            pkgname: "hello".into(),
            pkgbase: "hello".into(),
            pkgver: "1.0.0-1".into(),
            pkgarch: "x86_64".into(),
            pkgbuild_sha256sum: "ff".into(),
            packager: "a@b".into(),
            builddate: 42,
            builddir: "/build/src".into(),
            startdir: "/build".into(),
            buildtool: "pkgforge".into(),
            buildtoolver: "0.3.0".into(),
            options: vec!["!strip".into()],
            ..Default::default()
        };
        let out = info.render();
        assert!(out.starts_with("format = 2\n"));
        assert!(out.contains("pkgbuild_sha256sum = ff\n"));
        assert!(out.contains("options = !strip\n"));
        assert!(out.contains("buildtool = pkgforge\n"));
    }
}
