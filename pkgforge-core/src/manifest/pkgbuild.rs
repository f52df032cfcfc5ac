use crate::manifest::Manifest;
use crate::recipe::Recipe;

/// A PKGBUILD rendered back from the in-memory manifest; the Pacman writer
/// drops it into the start directory and records its checksum in
/// `.BUILDINFO`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PkgBuild {
    pub pkgname: String,
    pub pkgver: String,
    pub pkgrel: String,
    pub epoch: String,
    pub pkgdesc: String,
    pub url: String,
    pub maintainer: String,
    pub arch: Vec<String>,
    pub license: Vec<String>,
    pub install: String,
    pub source: Vec<String>,
    pub hashsums_kind: String,
    pub hashsums: Vec<String>,
    pub backup: Vec<String>,
    pub depends: Vec<String>,
    pub makedepends: Vec<String>,
    pub optdepends: Vec<String>,
    pub conflicts: Vec<String>,
    pub provides: Vec<String>,
    pub replaces: Vec<String>,
    pub options: Vec<String>,
    pub prepare_func: String,
    pub build_func: String,
    pub package_func: String,
}

impl PkgBuild {
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let m = &recipe.metadata;
        Self {
            pkgname: m.name.clone(),
            pkgver: m.version.clone(),
            pkgrel: m.release.clone(),
            epoch: m.epoch.clone(),
            pkgdesc: m.description.clone(),
            url: m.url.clone(),
            maintainer: m.maintainer.clone(),
            arch: m.arch.iter().map(|a| a.to_string()).collect(),
            license: m.license.clone(),
            install: m.install.clone(),
            source: m.source.clone(),
            hashsums_kind: m.hashsums_kind.clone(),
            hashsums: m.hashsums.clone(),
            backup: m.backup.clone(),
            depends: m.depends.clone(),
            makedepends: m.makedepends.clone(),
            optdepends: m.optdepends.clone(),
            conflicts: m.conflicts.clone(),
            provides: m.provides.clone(),
            replaces: m.replaces.clone(),
            options: m.options.clone(),
            prepare_func: recipe.functions.prepare.clone(),
            build_func: recipe.functions.build.clone(),
            package_func: recipe.functions.package.clone(),
        }
    }
}

impl Manifest for PkgBuild {
    fn render(&self) -> String {
        let mut pkg = String::new();

        macro_rules! push_field {
            ($field:ident) => {
                pkg.push_str(&format!("{}={}\n", stringify!($field), &self.$field));
            };
        }

        macro_rules! push_if_set {
            ($field:ident) => {
                if !self.$field.is_empty() {
                    pkg.push_str(&format!("{}={}\n", stringify!($field), &self.$field));
                }
            };
        }

        macro_rules! push_array {
            ($field:ident) => {
                push_array!($field, stringify!($field));
            };
            ($field:ident, $key:expr) => {
                if !self.$field.is_empty() {
                    let elems: Vec<_> = self
                        .$field
                        .iter()
                        .map(|elem| format!("'{}'", elem))
                        .collect();
                    pkg.push_str(&format!("{}=({})\n", $key, elems.join(" ")));
                }
            };
        }

        macro_rules! push_func {
            ($field:ident, $name:literal) => {
                if !self.$field.is_empty() {
                    pkg.push_str(&format!("\n{}() {{\n{}\n}}\n", $name, &self.$field));
                }
            };
        }

        if !self.maintainer.is_empty() {
            pkg.push_str(&format!("# Maintainer: {}\n", &self.maintainer));
        }
        push_field!(pkgname);
        push_field!(pkgver);
        push_field!(pkgrel);
        push_if_set!(epoch);
        if !self.pkgdesc.is_empty() {
            pkg.push_str(&format!("pkgdesc='{}'\n", &self.pkgdesc));
        }
        push_if_set!(url);
        push_array!(arch);
        push_array!(license);
        push_if_set!(install);
        push_array!(source);
        push_array!(hashsums, self.hashsums_kind.as_str());
        push_array!(backup);
        push_array!(depends);
        push_array!(makedepends);
        push_array!(optdepends);
        push_array!(conflicts);
        push_array!(provides);
        push_array!(replaces);
        push_array!(options);

        push_func!(prepare_func, "prepare");
        push_func!(build_func, "build");
        push_func!(package_func, "package");

        pkg
    }
}
