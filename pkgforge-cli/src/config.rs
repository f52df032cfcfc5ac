use crate::Result;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Defaults the CLI falls back to when a flag is not given.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Configuration {
    pub output_dir: Option<PathBuf>,
    pub distro: Option<String>,
    pub codename: Option<String>,
    pub format: Option<String>,
}

impl Configuration {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(serde_yaml::from_slice(&fs::read(path.as_ref())?)?)
    }
}
