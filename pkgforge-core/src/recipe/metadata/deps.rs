use std::fmt;

/// Version comparison operators accepted in dependency expressions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VersionOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl VersionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionOp::Lt => "<",
            VersionOp::Le => "<=",
            VersionOp::Eq => "=",
            VersionOp::Ge => ">=",
            VersionOp::Gt => ">",
        }
    }
}

impl fmt::Display for VersionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency expression of the form `name[OP version]`. Plain names pass
/// through every formatter unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub constraint: Option<(VersionOp, String)>,
}

impl Dependency {
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        let Some(idx) = expr.find(|c| c == '<' || c == '>' || c == '=') else {
            return Self {
                name: expr.to_string(),
                constraint: None,
            };
        };

        let name = expr[..idx].trim();
        let rest = &expr[idx..];
        let (op, version) = if let Some(v) = rest.strip_prefix("<=") {
            (VersionOp::Le, v)
        } else if let Some(v) = rest.strip_prefix(">=") {
            (VersionOp::Ge, v)
        } else if let Some(v) = rest.strip_prefix('<') {
            (VersionOp::Lt, v)
        } else if let Some(v) = rest.strip_prefix('>') {
            (VersionOp::Gt, v)
        } else {
            (VersionOp::Eq, &rest[1..])
        };
        let version = version.trim();

        if name.is_empty() || version.is_empty() {
            return Self {
                name: expr.to_string(),
                constraint: None,
            };
        }

        Self {
            name: name.to_string(),
            constraint: Some((op, version.to_string())),
        }
    }

    /// `name (OP version)` as DEB control fields expect it.
    pub fn deb_format(&self) -> String {
        match &self.constraint {
            Some((op, version)) => format!("{} ({} {})", self.name, op, version),
            None => self.name.clone(),
        }
    }

    /// `name OP version`, the space-separated form RPM relations accept.
    pub fn rpm_format(&self) -> String {
        match &self.constraint {
            Some((op, version)) => format!("{} {} {}", self.name, op, version),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_all_operators() {
        for (expr, op, ver) in [
            ("libc>=2.28", VersionOp::Ge, "2.28"),
            ("libc<=2.28", VersionOp::Le, "2.28"),
            ("libc=2.28", VersionOp::Eq, "2.28"),
            ("libc<2.28", VersionOp::Lt, "2.28"),
            ("libc>2.28", VersionOp::Gt, "2.28"),
            ("libc >= 2.28", VersionOp::Ge, "2.28"),
        ] {
            let dep = Dependency::parse(expr);
            assert_eq!(dep.name, "libc", "{}", expr);
            assert_eq!(dep.constraint, Some((op, ver.to_string())), "{}", expr);
        }
    }

    #[test]
    fn plain_names_pass_through() {
        let dep = Dependency::parse("zlib");
        assert_eq!(dep.name, "zlib");
        assert_eq!(dep.constraint, None);
        assert_eq!(dep.deb_format(), "zlib");
        assert_eq!(dep.rpm_format(), "zlib");
    }

    #[test]
    fn formats_per_family() {
        let dep = Dependency::parse("libssl>=1.1");
        assert_eq!(dep.deb_format(), "libssl (>= 1.1)");
        assert_eq!(dep.rpm_format(), "libssl >= 1.1");
    }

    #[test]
    fn degenerate_expressions_stay_verbatim() {
        assert_eq!(Dependency::parse(">=1.0").name, ">=1.0");
        assert_eq!(Dependency::parse("libfoo>=").name, "libfoo>=");
    }
}
