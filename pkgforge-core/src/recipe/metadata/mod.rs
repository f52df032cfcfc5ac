mod arch;
mod deps;
mod license;
mod os;

pub use arch::{compute_architecture, BuildArch};
pub use deps::{Dependency, VersionOp};
pub use license::is_valid_license;
pub use os::{DistroId, PackageFamily};

use crate::Result;

use std::collections::HashMap;
use std::convert::TryFrom;

/// Scalar recipe keys the model recognizes.
pub const SCALAR_KEYS: &[&str] = &[
    "pkgname",
    "pkgver",
    "pkgrel",
    "epoch",
    "pkgdesc",
    "maintainer",
    "url",
    "section",
    "priority",
    "install",
    "debconf_template",
    "debconf_config",
    "target_arch",
    "build_arch",
    "host_arch",
];

/// Array recipe keys the model recognizes, checksum lists excluded.
pub const ARRAY_KEYS: &[&str] = &[
    "arch",
    "license",
    "copyright",
    "depends",
    "makedepends",
    "optdepends",
    "provides",
    "conflicts",
    "replaces",
    "options",
    "source",
    "backup",
];

/// Checksum list keys; the last one assigned wins and fills `hashsums`.
pub const HASHSUM_KEYS: &[&str] = &[
    "sha224sums",
    "sha256sums",
    "sha384sums",
    "sha512sums",
    "b2sums",
    "cksums",
];

/// The canonical in-memory package manifest a recipe parses into.
#[derive(Clone, Debug, PartialEq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub release: String,
    pub epoch: String,
    pub description: String,
    pub url: String,
    pub maintainer: String,
    pub section: String,
    pub priority: String,
    pub install: String,
    pub debconf_template: String,
    pub debconf_config: String,
    pub target_arch: String,
    pub build_arch: String,
    pub host_arch: String,

    pub arch: Vec<BuildArch>,
    pub arch_computed: Option<BuildArch>,

    pub depends: Vec<String>,
    pub makedepends: Vec<String>,
    pub optdepends: Vec<String>,
    pub provides: Vec<String>,
    pub conflicts: Vec<String>,
    pub replaces: Vec<String>,

    pub license: Vec<String>,
    pub copyright: Vec<String>,
    pub source: Vec<String>,
    pub hashsums: Vec<String>,
    /// Which checksum list filled `hashsums` (e.g. `sha256sums`).
    pub hashsums_kind: String,
    pub backup: Vec<String>,
    pub options: Vec<String>,

    pub strip_enabled: bool,
    pub static_enabled: bool,

    pub installed_size: i64,
    pub build_date: i64,
    pub data_hash: String,
    pub checksum: String,

    pub distro: DistroId,

    priorities: HashMap<String, i32>,
}

impl Default for PackageMetadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: String::new(),
            release: String::new(),
            epoch: String::new(),
            description: String::new(),
            url: String::new(),
            maintainer: String::new(),
            section: String::new(),
            priority: String::new(),
            install: String::new(),
            debconf_template: String::new(),
            debconf_config: String::new(),
            target_arch: String::new(),
            build_arch: String::new(),
            host_arch: String::new(),
            arch: Vec::new(),
            arch_computed: None,
            depends: Vec::new(),
            makedepends: Vec::new(),
            optdepends: Vec::new(),
            provides: Vec::new(),
            conflicts: Vec::new(),
            replaces: Vec::new(),
            license: Vec::new(),
            copyright: Vec::new(),
            source: Vec::new(),
            hashsums: Vec::new(),
            hashsums_kind: "sha256sums".to_string(),
            backup: Vec::new(),
            options: Vec::new(),
            strip_enabled: true,
            static_enabled: true,
            installed_size: 0,
            build_date: 0,
            data_hash: String::new(),
            checksum: String::new(),
            distro: DistroId::default(),
            priorities: HashMap::new(),
        }
    }
}

impl PackageMetadata {
    /// Overwrite-on-higher-priority check: an entry is stored when its
    /// priority is at least the one recorded for the key so far.
    fn should_store(&mut self, key: &str, priority: i32) -> bool {
        if priority < 0 {
            return false;
        }
        match self.priorities.get(key) {
            Some(&stored) if priority < stored => false,
            _ => {
                self.priorities.insert(key.to_string(), priority);
                true
            }
        }
    }

    /// Applies a scalar assignment for `key` at `priority`. Returns `false`
    /// when the key isn't a recognized scalar field or the priority loses.
    pub(crate) fn apply_scalar(&mut self, key: &str, value: String, priority: i32) -> bool {
        if !SCALAR_KEYS.contains(&key) || !self.should_store(key, priority) {
            return false;
        }
        let field = match key {
            "pkgname" => &mut self.name,
            "pkgver" => &mut self.version,
            "pkgrel" => &mut self.release,
            "epoch" => &mut self.epoch,
            "pkgdesc" => &mut self.description,
            "maintainer" => &mut self.maintainer,
            "url" => &mut self.url,
            "section" => &mut self.section,
            "priority" => &mut self.priority,
            "install" => &mut self.install,
            "debconf_template" => &mut self.debconf_template,
            "debconf_config" => &mut self.debconf_config,
            "target_arch" => &mut self.target_arch,
            "build_arch" => &mut self.build_arch,
            "host_arch" => &mut self.host_arch,
            _ => unreachable!("key checked against SCALAR_KEYS"),
        };
        *field = value;
        true
    }

    /// Applies an array assignment for `key` at `priority`. Returns `false`
    /// for unrecognized keys and losing priorities; fails on malformed
    /// values (unrecognized architectures).
    pub(crate) fn apply_array(
        &mut self,
        key: &str,
        values: Vec<String>,
        priority: i32,
    ) -> Result<bool> {
        if HASHSUM_KEYS.contains(&key) {
            // all checksum lists share one slot; the last assignment wins
            if !self.should_store("hashsums", priority) {
                return Ok(false);
            }
            self.hashsums = values;
            self.hashsums_kind = key.to_string();
            return Ok(true);
        }

        if !ARRAY_KEYS.contains(&key) || !self.should_store(key, priority) {
            return Ok(false);
        }
        match key {
            "arch" => {
                self.arch = values
                    .iter()
                    .map(|v| BuildArch::try_from(v.as_str()))
                    .collect::<Result<Vec<_>>>()?;
            }
            "license" => self.license = values,
            "copyright" => self.copyright = values,
            "depends" => self.depends = values,
            "makedepends" => self.makedepends = values,
            "optdepends" => self.optdepends = values,
            "provides" => self.provides = values,
            "conflicts" => self.conflicts = values,
            "replaces" => self.replaces = values,
            "options" => self.options = values,
            "source" => self.source = values,
            "backup" => self.backup = values,
            _ => unreachable!("key checked against ARRAY_KEYS"),
        }
        Ok(true)
    }

    /// Clears feature flags named in `options`; matching is by substring the
    /// way makepkg treats negated options.
    pub(crate) fn process_options(&mut self) {
        for opt in &self.options {
            if opt.contains("!strip") {
                self.strip_enabled = false;
            }
            if opt.contains("!staticlibs") {
                self.static_enabled = false;
            }
        }
    }

    /// The epoch when it is set and meaningful (non-empty, non-zero).
    pub fn epoch_nonzero(&self) -> Option<&str> {
        if self.epoch.is_empty() || self.epoch == "0" {
            None
        } else {
            Some(&self.epoch)
        }
    }

    /// The resolved build architecture; set by the orchestrator before any
    /// writer runs.
    pub fn target_arch(&self) -> Result<BuildArch> {
        self.arch_computed
            .ok_or_else(|| anyhow!("architecture has not been resolved for `{}`", self.name))
    }

    /// `version-rPKGREL`, the APK version string.
    pub fn apk_pkgver(&self) -> String {
        format!("{}-r{}", self.version, self.release)
    }

    /// `[epoch:]version-pkgrel`, the Pacman version string.
    pub fn pacman_pkgver(&self) -> String {
        match self.epoch_nonzero() {
            Some(epoch) => format!("{}:{}-{}", epoch, self.version, self.release),
            None => format!("{}-{}", self.version, self.release),
        }
    }

    /// `[epoch:]version-pkgrel`, the DEB `Version` field.
    pub fn deb_version(&self) -> String {
        self.pacman_pkgver()
    }

    /// The DEB revision: pkgrel with the codename appended when one is set.
    pub fn deb_release(&self) -> String {
        if self.distro.codename.is_empty() {
            self.release.clone()
        } else {
            format!("{}{}", self.release, self.distro.codename)
        }
    }

    /// The RPM `Release`: pkgrel plus the distribution tag and codename
    /// (`1.fc38`-style) when both are known.
    pub fn rpm_release(&self) -> String {
        match (self.distro.rpm_dist_tag(), self.distro.codename.is_empty()) {
            (Some(tag), false) => format!("{}{}{}", self.release, tag, self.distro.codename),
            _ => self.release.clone(),
        }
    }

    /// First line of the description, used where a one-line summary is
    /// expected.
    pub fn summary(&self) -> &str {
        self.description.lines().next().unwrap_or_default()
    }
}
