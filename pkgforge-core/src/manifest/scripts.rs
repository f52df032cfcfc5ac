use crate::manifest::Manifest;
use crate::recipe::Scriptlets;

/// Guard prepended to DEB `prerm`/`postrm` so they only run when the package
/// is actually being removed, not upgraded.
pub const DEB_REMOVE_GUARD: &str =
    "if [ \"$1\" != \"remove\" ] && [ \"$1\" != \"purge\" ]; then\n    exit 0\nfi\n";

/// Guard prepended to RPM `%preun`/`%postun`; `$1` is the count of versions
/// staying installed, so non-zero means an upgrade.
pub const RPM_REMOVE_GUARD: &str = "if [ $1 -ne 0 ]; then exit 0; fi\n";

/// Assembles a DEB maintainer script. `guarded` prepends the removal guard.
pub fn deb_maintainer_script(body: &str, guarded: bool) -> String {
    let mut script = String::from("#!/bin/sh\nset -e\n");
    if guarded {
        script.push_str(DEB_REMOVE_GUARD);
    }
    script.push_str(body);
    if !body.ends_with('\n') {
        script.push('\n');
    }
    script
}

/// The `{pkgname}.install` function file Pacman expects.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PacmanInstall {
    pub scriptlets: Scriptlets,
}

impl From<&Scriptlets> for PacmanInstall {
    fn from(scriptlets: &Scriptlets) -> Self {
        Self {
            scriptlets: scriptlets.clone(),
        }
    }
}

impl Manifest for PacmanInstall {
    fn render(&self) -> String {
        let mut out = String::new();
        let mut func = |name: &str, body: &str| {
            if !body.is_empty() {
                out.push_str(&format!("{}() {{\n{}\n}}\n\n", name, body));
            }
        };

        func("pre_install", &self.scriptlets.pre_install);
        func("post_install", &self.scriptlets.post_install);
        func("pre_upgrade", &self.scriptlets.pre_install);
        func("post_upgrade", &self.scriptlets.post_install);
        func("pre_remove", &self.scriptlets.pre_remove);
        func("post_remove", &self.scriptlets.post_remove);

        out.trim_end().to_string() + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn guarded_scripts_exit_early_on_upgrade() {
        let script = deb_maintainer_script("echo removing", true);
        assert!(script.starts_with("#!/bin/sh\nset -e\nif [ \"$1\" != \"remove\" ]"));
        assert!(script.ends_with("echo removing\n"));

        let plain = deb_maintainer_script("echo installing\n", false);
        assert_eq!(plain, "#!/bin/sh\nset -e\necho installing\n");
    }

    #[test]
    fn install_file_renders_only_present_functions() {
        let scriptlets = Scriptlets {
            post_install: "    echo done".into(),
            pre_remove: "    echo bye".into(),
            ..Default::default()
        };
        let out = PacmanInstall::from(&scriptlets).render();
        assert!(out.contains("post_install() {\n    echo done\n}"));
        assert!(out.contains("post_upgrade() {\n    echo done\n}"));
        assert!(out.contains("pre_remove() {\n    echo bye\n}"));
        assert!(!out.contains("pre_install()"));
        assert!(!out.contains("post_remove()"));
    }
}
