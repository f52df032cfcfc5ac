//! Recipe key suffix grammar: `key[_ARCH][__DISTROTAG]`.
//!
//! Every key parses once into a tagged record; a small decision table turns
//! the record into a merge priority against the current distro/arch identity.

use crate::error::PackagingError;
use crate::recipe::metadata::{BuildArch, DistroId};
use crate::Result;

use std::convert::TryFrom;

/// A recipe key split into its base name and optional suffix tags.
#[derive(Debug, PartialEq, Eq)]
pub struct Directive<'a> {
    pub base: &'a str,
    pub arch_tag: Option<&'a str>,
    pub distro_tag: Option<&'a str>,
}

/// Architecture identifiers an arch suffix may carry (the `any` pseudo-arch
/// is not a valid suffix).
const ARCH_TAGS: &[&str] = &[
    "x86_64", "i686", "aarch64", "armv7h", "armv6h", "ppc64le", "s390x", "riscv64", "pentium4",
];

impl<'a> Directive<'a> {
    /// Splits `key` into base, arch tag and distro tag. More than one distro
    /// separator is a malformed suffix.
    pub fn parse(key: &'a str) -> Result<Self> {
        let mut parts = key.splitn(3, "__");
        let head = parts.next().unwrap_or_default();
        let distro_tag = parts.next();
        if parts.next().is_some() {
            return Err(PackagingError::Parse(format!(
                "malformed directive suffix in `{}`",
                key
            ))
            .into());
        }

        let (base, arch_tag) = match ARCH_TAGS
            .iter()
            .find_map(|tag| head.strip_suffix(tag).and_then(|b| b.strip_suffix('_')))
        {
            Some(base) if !base.is_empty() => (base, Some(&head[base.len() + 1..])),
            _ => (head, None),
        };

        if base.is_empty() {
            return Err(PackagingError::Parse(format!(
                "malformed directive suffix in `{}`",
                key
            ))
            .into());
        }

        Ok(Self {
            base,
            arch_tag,
            distro_tag,
        })
    }

    /// Resolves this directive's merge priority against the build identity:
    ///
    /// * 4: the arch tag matches the target architecture (any distro tag is
    ///   irrelevant then),
    /// * 3: the distro tag matches `distro_codename`,
    /// * 2: the distro tag matches the distro identifier,
    /// * 1: the distro tag matches the package-manager family,
    /// * 0: no suffix at all,
    /// * -1: suffixes present but none of them matches.
    pub fn priority(&self, distro: &DistroId, target_arch: BuildArch) -> i32 {
        if let Some(tag) = self.arch_tag {
            return match BuildArch::try_from(tag) {
                Ok(arch) if arch == target_arch => 4,
                _ => -1,
            };
        }
        if let Some(tag) = self.distro_tag {
            if !distro.codename.is_empty() && tag == distro.full_name() {
                return 3;
            }
            if tag == distro.distro {
                return 2;
            }
            if tag == distro.family().as_ref() {
                return 1;
            }
            return -1;
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ubuntu_focal() -> DistroId {
        DistroId::new("ubuntu", "focal")
    }

    #[test]
    fn splits_base_arch_and_distro_tags() {
        assert_eq!(
            Directive::parse("depends").unwrap(),
            Directive {
                base: "depends",
                arch_tag: None,
                distro_tag: None
            }
        );
        assert_eq!(
            Directive::parse("depends_x86_64").unwrap(),
            Directive {
                base: "depends",
                arch_tag: Some("x86_64"),
                distro_tag: None
            }
        );
        assert_eq!(
            Directive::parse("depends__ubuntu_focal").unwrap(),
            Directive {
                base: "depends",
                arch_tag: None,
                distro_tag: Some("ubuntu_focal")
            }
        );
        assert_eq!(
            Directive::parse("depends_aarch64__debian").unwrap(),
            Directive {
                base: "depends",
                arch_tag: Some("aarch64"),
                distro_tag: Some("debian")
            }
        );
    }

    #[test]
    fn keys_with_inner_underscores_are_not_arch_tagged() {
        let d = Directive::parse("debconf_template").unwrap();
        assert_eq!(d.base, "debconf_template");
        assert_eq!(d.arch_tag, None);

        let d = Directive::parse("target_arch").unwrap();
        assert_eq!(d.base, "target_arch");
    }

    #[test]
    fn more_than_two_suffixes_is_malformed() {
        let err = Directive::parse("depends__ubuntu__focal").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackagingError>(),
            Some(PackagingError::Parse(_))
        ));
    }

    #[test]
    fn priorities_follow_the_decision_table() {
        let distro = ubuntu_focal();
        let arch = BuildArch::x86_64;

        let pri = |key: &str| Directive::parse(key).unwrap().priority(&distro, arch);

        assert_eq!(pri("depends"), 0);
        assert_eq!(pri("depends__debian"), 1);
        assert_eq!(pri("depends__ubuntu"), 2);
        assert_eq!(pri("depends__ubuntu_focal"), 3);
        assert_eq!(pri("depends_x86_64"), 4);
        assert_eq!(pri("depends_x86_64__alpine"), 4);
        assert_eq!(pri("depends_aarch64"), -1);
        assert_eq!(pri("depends_aarch64__ubuntu"), -1);
        assert_eq!(pri("depends__alpine"), -1);
    }

    #[test]
    fn codename_tag_needs_a_codename() {
        let distro = DistroId::new("ubuntu", "");
        let d = Directive::parse("depends__ubuntu_focal").unwrap();
        assert_eq!(d.priority(&distro, BuildArch::x86_64), -1);
    }
}
