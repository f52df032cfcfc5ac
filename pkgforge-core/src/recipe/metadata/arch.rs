use crate::error::PackagingError;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::fmt::Formatter;

/// The recognized architecture identifiers. Everything inside the engine
/// speaks these names; format-specific synonyms exist only behind the
/// `*_name` translation methods.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum BuildArch {
    x86_64,
    i686,
    Aarch64,
    Armv7h,
    Armv6h,
    Ppc64le,
    S390x,
    Riscv64,
    Pentium4,
    Any,
}

impl TryFrom<&str> for BuildArch {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        use BuildArch::*;
        match s {
            "x86_64" => Ok(x86_64),
            "i686" => Ok(i686),
            "aarch64" => Ok(Aarch64),
            "armv7h" => Ok(Armv7h),
            "armv6h" => Ok(Armv6h),
            "ppc64le" => Ok(Ppc64le),
            "s390x" => Ok(S390x),
            "riscv64" => Ok(Riscv64),
            "pentium4" => Ok(Pentium4),
            "any" => Ok(Any),
            arch => Err(anyhow!("unrecognized architecture `{}`", arch)),
        }
    }
}

impl AsRef<str> for BuildArch {
    fn as_ref(&self) -> &str {
        use BuildArch::*;
        match self {
            x86_64 => "x86_64",
            i686 => "i686",
            Aarch64 => "aarch64",
            Armv7h => "armv7h",
            Armv6h => "armv6h",
            Ppc64le => "ppc64le",
            S390x => "s390x",
            Riscv64 => "riscv64",
            Pentium4 => "pentium4",
            Any => "any",
        }
    }
}

impl fmt::Display for BuildArch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl BuildArch {
    /// The architecture of the running host, if it is one this engine can
    /// package for.
    pub fn host() -> Option<Self> {
        use BuildArch::*;
        match std::env::consts::ARCH {
            "x86_64" => Some(x86_64),
            "x86" => Some(i686),
            "aarch64" => Some(Aarch64),
            "arm" => Some(Armv7h),
            "powerpc64" => Some(Ppc64le),
            "s390x" => Some(S390x),
            "riscv64" => Some(Riscv64),
            _ => None,
        }
    }

    pub fn apk_name(&self) -> &str {
        use BuildArch::*;
        match self {
            i686 => "x86",
            Any => "all",
            other => other.as_ref(),
        }
    }

    pub fn deb_name(&self) -> &str {
        use BuildArch::*;
        match self {
            x86_64 => "amd64",
            i686 | Pentium4 => "i386",
            Aarch64 => "arm64",
            Armv7h => "armhf",
            Any => "all",
            other => other.as_ref(),
        }
    }

    pub fn rpm_name(&self) -> &str {
        use BuildArch::*;
        match self {
            Any => "noarch",
            other => other.as_ref(),
        }
    }

    pub fn pkg_name(&self) -> &str {
        self.as_ref()
    }
}

/// Resolves the architecture a package will be built as: `any` wins if the
/// recipe declares it, otherwise the target must be declared by the recipe.
pub fn compute_architecture(declared: &[BuildArch], target: BuildArch) -> Result<BuildArch> {
    if declared.contains(&BuildArch::Any) {
        return Ok(BuildArch::Any);
    }
    if declared.contains(&target) {
        return Ok(target);
    }
    Err(PackagingError::Architecture {
        target: target.to_string(),
        supported: declared
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(", "),
    }
    .into())
}
