use serde::{Deserialize, Serialize};

/// Identity of the distribution a package is assembled for. The codename is
/// optional (empty when the distribution has none or it doesn't matter).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DistroId {
    pub distro: String,
    pub codename: String,
}

impl DistroId {
    pub fn new<D, C>(distro: D, codename: C) -> Self
    where
        D: Into<String>,
        C: Into<String>,
    {
        Self {
            distro: distro.into(),
            codename: codename.into(),
        }
    }

    /// `distro` or `distro_codename` when a codename is set.
    pub fn full_name(&self) -> String {
        if self.codename.is_empty() {
            self.distro.clone()
        } else {
            [self.distro.as_str(), self.codename.as_str()].join("_")
        }
    }

    pub fn family(&self) -> PackageFamily {
        PackageFamily::of(&self.distro)
    }

    /// The release suffix RPM distributions stamp into `Release`
    /// (`fc38`-style), without the codename.
    pub fn rpm_dist_tag(&self) -> Option<&'static str> {
        match self.distro.as_str() {
            "fedora" => Some(".fc"),
            "rhel" | "almalinux" | "rocky" => Some(".el"),
            "ol" => Some(".ol"),
            "amzn" => Some(".amzn"),
            _ => None,
        }
    }
}

/// Package-manager families, used for directive matching and for inferring
/// the output format from a distribution.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PackageFamily {
    Debian,
    RedHat,
    Arch,
    Alpine,
    Unknown,
}

impl PackageFamily {
    pub fn of(distro: &str) -> Self {
        use PackageFamily::*;
        match distro {
            "debian" | "ubuntu" | "pop" | "linuxmint" | "elementary" | "raspbian" | "devuan" => {
                Debian
            }
            "fedora" | "rhel" | "centos" | "almalinux" | "rocky" | "ol" | "amzn" => RedHat,
            "arch" | "manjaro" | "artix" => Arch,
            "alpine" => Alpine,
            _ => Unknown,
        }
    }
}

impl AsRef<str> for PackageFamily {
    fn as_ref(&self) -> &str {
        use PackageFamily::*;
        match self {
            Debian => "debian",
            RedHat => "redhat",
            Arch => "arch",
            Alpine => "alpine",
            Unknown => "",
        }
    }
}
