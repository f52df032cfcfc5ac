//! Post-parse recipe validation. Every problem is collected so a recipe
//! author sees the full list at once.

use crate::error::PackagingError;
use crate::recipe::metadata::is_valid_license;
use crate::recipe::Recipe;
use crate::Result;

pub(crate) fn validate(recipe: &Recipe) -> Result<()> {
    let mut problems = Vec::new();
    let m = &recipe.metadata;

    for (key, value) in [
        ("pkgname", &m.name),
        ("pkgver", &m.version),
        ("pkgrel", &m.release),
        ("pkgdesc", &m.description),
        ("maintainer", &m.maintainer),
    ] {
        if value.is_empty() {
            problems.push(format!("missing mandatory field `{}`", key));
        }
    }

    if m.source.len() != m.hashsums.len() {
        problems.push(format!(
            "source/hashsums length mismatch ({} sources, {} checksums)",
            m.source.len(),
            m.hashsums.len()
        ));
    }

    for license in &m.license {
        if !is_valid_license(license) {
            problems.push(format!("invalid license identifier `{}`", license));
        }
    }

    if recipe.functions.package.is_empty() {
        problems.push("missing package() function".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(PackagingError::Validation(problems).into())
    }
}
