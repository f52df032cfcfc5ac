use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pkgforge",
    version,
    about = "Assembles APK, DEB, RPM and Pacman packages from a single recipe"
)]
pub struct Opts {
    /// Suppress all output except errors.
    #[arg(short, long)]
    pub quiet: bool,
    /// Enable debug output.
    #[arg(short, long)]
    pub debug: bool,
    /// Enable trace output.
    #[arg(short, long)]
    pub trace: bool,
    /// Path to the config file (default - ".pkgforge.yml").
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Assembles a package from a recipe and a staged package root.
    Build(BuildOpts),
}

#[derive(Debug, Args)]
pub struct BuildOpts {
    /// Path to the recipe file.
    #[arg(short, long, default_value = "PKGBUILD")]
    pub recipe: PathBuf,
    /// Target package format: apk, deb, rpm or pkg. Inferred from the
    /// distribution family when omitted.
    #[arg(short, long)]
    pub format: Option<String>,
    /// Staging directory whose contents become `/` in the built package.
    /// Defaults to `pkg` next to the recipe.
    #[arg(short = 's', long)]
    pub package_dir: Option<PathBuf>,
    /// Directory the finished package is written to.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Distribution identifier the package is built for (e.g. `ubuntu`).
    #[arg(long)]
    pub distro: Option<String>,
    /// Distribution codename or version (e.g. `focal`, `38`).
    #[arg(long)]
    pub codename: Option<String>,
    /// Target architecture; defaults to the host architecture.
    #[arg(short, long)]
    pub arch: Option<String>,
    /// Overrides the recipe pkgver unconditionally.
    #[arg(long)]
    pub pkgver: Option<String>,
    /// Overrides the recipe pkgrel unconditionally.
    #[arg(long)]
    pub pkgrel: Option<String>,
}
