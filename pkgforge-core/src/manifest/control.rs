use crate::manifest::{join, multiline, Manifest};
use crate::recipe::{Dependency, Recipe};
use crate::walk::backup_set;
use crate::Result;

use std::fmt::Write;

/// The `control` file of a binary DEB package.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BinaryDebControl {
    pub package: String,
    /// `[epoch:]version-revision`, revision already carrying the codename.
    pub version: String,
    pub architecture: String,
    pub maintainer: String,
    /// Estimated on-disk size in KiB.
    pub installed_size: u64,
    pub section: String,
    pub priority: String,
    pub homepage: String,
    pub description: String,
    pub depends: Vec<String>,
    pub suggests: Vec<String>,
    pub conflicts: Vec<String>,
    pub replaces: Vec<String>,
    pub provides: Vec<String>,
}

impl BinaryDebControl {
    pub fn from_recipe(recipe: &Recipe) -> Result<Self> {
        let m = &recipe.metadata;
        let version = match m.epoch_nonzero() {
            Some(epoch) => format!("{}:{}-{}", epoch, m.version, m.deb_release()),
            None => format!("{}-{}", m.version, m.deb_release()),
        };
        let deb_fmt = |deps: &[String]| -> Vec<String> {
            deps.iter().map(|d| Dependency::parse(d).deb_format()).collect()
        };
        Ok(Self {
            package: m.name.clone(),
            version,
            architecture: m.target_arch()?.deb_name().to_string(),
            maintainer: m.maintainer.clone(),
            installed_size: 0,
            section: m.section.clone(),
            priority: m.priority.clone(),
            homepage: m.url.clone(),
            description: m.description.clone(),
            depends: deb_fmt(&m.depends),
            suggests: deb_fmt(&m.optdepends),
            conflicts: deb_fmt(&m.conflicts),
            replaces: deb_fmt(&m.replaces),
            provides: deb_fmt(&m.provides),
        })
    }
}

impl Manifest for BinaryDebControl {
    fn render(&self) -> String {
        let mut control = String::new();
        let _ = writeln!(control, "Package: {}", self.package);
        let _ = writeln!(control, "Version: {}", self.version);
        let _ = writeln!(control, "Architecture: {}", self.architecture);
        let _ = writeln!(control, "Maintainer: {}", self.maintainer);
        if self.installed_size > 0 {
            let _ = writeln!(control, "Installed-Size: {}", self.installed_size);
        }

        macro_rules! if_not_empty {
            ($field:ident, $name:literal) => {
                if !self.$field.is_empty() {
                    let _ = writeln!(control, concat!($name, ": {}"), self.$field);
                }
            };
        }
        macro_rules! if_not_empty_entries {
            ($field:ident, $name:literal) => {
                if !self.$field.is_empty() {
                    let _ = writeln!(control, concat!($name, ": {}"), join(&self.$field));
                }
            };
        }

        if_not_empty!(section, "Section");
        if_not_empty!(priority, "Priority");
        if_not_empty!(homepage, "Homepage");
        if_not_empty_entries!(depends, "Depends");
        if_not_empty_entries!(suggests, "Suggests");
        if_not_empty_entries!(conflicts, "Conflicts");
        if_not_empty_entries!(replaces, "Replaces");
        if_not_empty_entries!(provides, "Provides");

        // continuation lines must stay non-empty for control parsers
        let description = if self.description.is_empty() {
            "(none)".to_string()
        } else {
            self.description
                .lines()
                .map(|l| if l.trim().is_empty() { "." } else { l })
                .collect::<Vec<_>>()
                .join("\n")
        };
        let _ = writeln!(control, "Description: {}", multiline(&description));

        control
    }
}

/// Renders `DEBIAN/conffiles`: one absolute path per line, duplicates
/// dropped.
pub fn render_conffiles(backup: &[String]) -> String {
    let mut out = String::new();
    for path in backup_set(backup) {
        out.push_str(&path);
        out.push('\n');
    }
    out
}

/// The `DEBIAN/copyright` file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebCopyright {
    pub package: String,
    pub maintainer: String,
    pub licenses: Vec<String>,
    pub notices: Vec<String>,
}

impl DebCopyright {
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let m = &recipe.metadata;
        Self {
            package: m.name.clone(),
            maintainer: m.maintainer.clone(),
            licenses: m.license.clone(),
            notices: m.copyright.clone(),
        }
    }
}

impl Manifest for DebCopyright {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Format: https://www.debian.org/doc/packaging-manuals/copyright-format/1.0/"
        );
        let _ = writeln!(out, "Upstream-Name: {}", self.package);
        let _ = writeln!(out);
        let _ = writeln!(out, "Files: *");
        for notice in &self.notices {
            let _ = writeln!(out, "Copyright: {}", notice);
        }
        if self.notices.is_empty() {
            let _ = writeln!(out, "Copyright: {}", self.maintainer);
        }
        let _ = writeln!(out, "License: {}", join(&self.licenses));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_a_full_control() {
        let control = BinaryDebControl {
            package: "hello".into(),
            version: "2:1.0.0-1focal".into(),
            architecture: "amd64".into(),
            maintainer: "A B <a@b>".into(),
            installed_size: 12,
            section: "utils".into(),
            priority: "optional".into(),
            homepage: "https://example.com".into(),
            description: "greeter\nlong text\n\nmore".into(),
            depends: vec!["libc6 (>= 2.28)".into(), "zlib1g".into()],
            ..Default::default()
        };
        let out = control.render();
        assert!(out.starts_with("Package: hello\n"));
        assert!(out.contains("Version: 2:1.0.0-1focal\n"));
        assert!(out.contains("Installed-Size: 12\n"));
        assert!(out.contains("Depends: libc6 (>= 2.28), zlib1g\n"));
        assert!(out.contains("Description: greeter\n long text\n .\n more\n"));
    }

    #[test]
    fn minimal_control_has_no_optional_fields() {
        let control = BinaryDebControl {
            package: "x".into(),
            version: "1-1".into(),
            architecture: "all".into(),
            maintainer: "m".into(),
            ..Default::default()
        };
        let out = control.render();
        assert!(!out.contains("Section:"));
        assert!(!out.contains("Depends:"));
        assert!(!out.contains("Installed-Size:"));
        assert!(out.contains("Description: (none)\n"));
    }

    #[test]
    fn conffiles_are_absolute_and_deduplicated() {
        let backup = vec![
            "etc/app.conf".to_string(),
            "/etc/app.conf".to_string(),
            "etc/other.conf".to_string(),
        ];
        assert_eq!(
            render_conffiles(&backup),
            "/etc/app.conf\n/etc/other.conf\n"
        );
    }

    #[test]
    fn copyright_names_the_licenses() {
        let copyright = DebCopyright {
            package: "hello".into(),
            maintainer: "a@b".into(),
            licenses: vec!["MIT".into(), "Apache-2.0".into()],
            notices: vec![],
        };
        let out = copyright.render();
        assert!(out.contains("Upstream-Name: hello"));
        assert!(out.contains("License: MIT, Apache-2.0"));
        assert!(out.contains("Copyright: a@b"));
    }
}
