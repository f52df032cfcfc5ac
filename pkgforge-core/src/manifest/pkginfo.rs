use crate::manifest::{join, Manifest, BUILD_TOOL, BUILD_TOOL_VERSION};
use crate::recipe::Recipe;
use crate::Result;

use std::fmt::Write;

/// The `.PKGINFO` file embedded in an APK control segment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApkPkgInfo {
    pub pkgname: String,
    /// `version-rPKGREL`.
    pub pkgver: String,
    pub pkgdesc: String,
    pub url: String,
    pub builddate: i64,
    pub packager: String,
    pub size: i64,
    pub arch: String,
    pub origin: String,
    pub license: String,
    pub depends: Vec<String>,
    pub provides: Vec<String>,
    pub replaces: Vec<String>,
    /// Hex SHA-256 of the data segment, back-patched after the data archive
    /// exists.
    pub datahash: String,
}

impl ApkPkgInfo {
    pub fn from_recipe(recipe: &Recipe) -> Result<Self> {
        let m = &recipe.metadata;
        Ok(Self {
            pkgname: m.name.clone(),
            pkgver: m.apk_pkgver(),
            pkgdesc: m.description.clone(),
            url: m.url.clone(),
            builddate: m.build_date,
            packager: m.maintainer.clone(),
            size: m.installed_size,
            arch: m.target_arch()?.apk_name().to_string(),
            origin: m.name.clone(),
            license: join(&m.license),
            depends: m.depends.clone(),
            provides: m.provides.clone(),
            replaces: m.replaces.clone(),
            datahash: m.data_hash.clone(),
        })
    }
}

impl Manifest for ApkPkgInfo {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Generated by {} {}", BUILD_TOOL, BUILD_TOOL_VERSION);

        let mut kv = |key: &str, value: &str| {
            if !value.is_empty() {
                out.push_str(key);
                out.push_str(" = ");
                out.push_str(value);
                out.push('\n');
            }
        };

        kv("pkgname", &self.pkgname);
        kv("pkgver", &self.pkgver);
        kv("pkgdesc", &self.pkgdesc);
        kv("url", &self.url);
        kv("builddate", &self.builddate.to_string());
        kv("packager", &self.packager);
        kv("size", &self.size.to_string());
        kv("arch", &self.arch);
        kv("origin", &self.origin);
        kv("license", &self.license);
        for depend in &self.depends {
            kv("depend", depend);
        }
        for provide in &self.provides {
            kv("provides", provide);
        }
        for replace in &self.replaces {
            kv("replaces", replace);
        }
        kv("datahash", &self.datahash);

        out
    }
}

/// The `.PKGINFO` file at the root of a Pacman package.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PacmanPkgInfo {
    pub pkgname: String,
    pub pkgbase: String,
    /// `[epoch:]version-pkgrel`.
    pub pkgver: String,
    pub pkgdesc: String,
    pub url: String,
    pub builddate: i64,
    pub packager: String,
    pub size: i64,
    pub arch: String,
    pub license: Vec<String>,
    pub replaces: Vec<String>,
    pub conflicts: Vec<String>,
    pub provides: Vec<String>,
    /// Package-relative backup paths (no leading slash).
    pub backup: Vec<String>,
    pub depends: Vec<String>,
    pub optdepends: Vec<String>,
    pub makedepends: Vec<String>,
}

impl PacmanPkgInfo {
    pub fn from_recipe(recipe: &Recipe) -> Result<Self> {
        let m = &recipe.metadata;
        let backup = crate::walk::backup_set(&m.backup)
            .into_iter()
            .map(|p| p.trim_start_matches('/').to_string())
            .collect();
        Ok(Self {
            pkgname: m.name.clone(),
            pkgbase: m.name.clone(),
            pkgver: m.pacman_pkgver(),
            pkgdesc: m.description.clone(),
            url: m.url.clone(),
            builddate: m.build_date,
            packager: m.maintainer.clone(),
            size: m.installed_size,
            arch: m.target_arch()?.pkg_name().to_string(),
            license: m.license.clone(),
            replaces: m.replaces.clone(),
            conflicts: m.conflicts.clone(),
            provides: m.provides.clone(),
            backup,
            depends: m.depends.clone(),
            optdepends: m.optdepends.clone(),
            makedepends: m.makedepends.clone(),
        })
    }
}

impl Manifest for PacmanPkgInfo {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Generated by {} {}", BUILD_TOOL, BUILD_TOOL_VERSION);

        let mut kv = |key: &str, value: &str| {
            if !value.is_empty() {
                out.push_str(key);
                out.push_str(" = ");
                out.push_str(value);
                out.push('\n');
            }
        };

        kv("pkgname", &self.pkgname);
        kv("pkgbase", &self.pkgbase);
        kv("pkgver", &self.pkgver);
        kv("pkgdesc", &self.pkgdesc);
        kv("url", &self.url);
        kv("builddate", &self.builddate.to_string());
        kv("packager", &self.packager);
        kv("size", &self.size.to_string());
        kv("arch", &self.arch);
        for license in &self.license {
            kv("license", license);
        }
        for replace in &self.replaces {
            kv("replaces", replace);
        }
        for conflict in &self.conflicts {
            kv("conflict", conflict);
        }
        for provide in &self.provides {
            kv("provides", provide);
        }
        for backup in &self.backup {
            kv("backup", backup);
        }
        for depend in &self.depends {
            kv("depend", depend);
        }
        for optdepend in &self.optdepends {
            kv("optdepend", optdepend);
        }
        for makedepend in &self.makedepends {
            kv("makedepend", makedepend);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_apk_pkginfo() {
        let info = ApkPkgInfo {
            pkgname: "hello".into(),
            pkgver: "1.0.0-r1".into(),
            pkgdesc: "greeter".into(),
            url: "https://example.com".into(),
            builddate: 42,
            packager: "a@b".into(),
            size: 14,
            arch: "x86_64".into(),
            origin: "hello".into(),
            license: "MIT".into(),
            depends: vec!["libc".into()],
            provides: vec![],
            replaces: vec![],
            datahash: "abc123".into(),
        };
        let out = info.render();
        assert!(out.starts_with("# Generated by pkgforge"));
        assert!(out.contains("pkgname = hello\n"));
        assert!(out.contains("pkgver = 1.0.0-r1\n"));
        assert!(out.contains("size = 14\n"));
        assert!(out.contains("depend = libc\n"));
        assert!(out.contains("datahash = abc123\n"));
    }

    #[test]
    fn empty_fields_are_omitted() {
        let info = ApkPkgInfo {
            pkgname: "hello".into(),
            pkgver: "1.0.0-r1".into(),
            ..Default::default()
        };
        let out = info.render();
        assert!(!out.contains("url = "));
        assert!(!out.contains("datahash = "));
    }

    #[test]
    fn renders_pacman_pkginfo_lists_line_by_line() {
        let info = PacmanPkgInfo {
            pkgname: "hello".into(),
            pkgbase: "hello".into(),
            pkgver: "2:1.0.0-1".into(),
            pkgdesc: "greeter".into(),
            builddate: 42,
            packager: "a@b".into(),
            size: 14,
            arch: "x86_64".into(),
            license: vec!["MIT".into(), "Apache-2.0".into()],
            backup: vec!["etc/app.conf".into()],
            depends: vec!["libc>=2.28".into()],
            ..Default::default()
        };
        let out = info.render();
        assert!(out.contains("pkgver = 2:1.0.0-1\n"));
        assert!(out.contains("license = MIT\nlicense = Apache-2.0\n"));
        assert!(out.contains("backup = etc/app.conf\n"));
        assert!(out.contains("depend = libc>=2.28\n"));
    }
}
