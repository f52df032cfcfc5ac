use std::convert::TryFrom;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pkgforge_core::package::{self, BuildTarget};
use pkgforge_core::recipe::{self, BuildArch, DistroId, Recipe};
use pkgforge_core::{ErrContext, Result};

use config::Configuration;
use opts::{BuildOpts, Command, Opts};

mod config;
mod opts;

static DEFAULT_CONFIG_FILE: &str = ".pkgforge.yml";

fn main() {
    let opts = Opts::parse();
    setup_tracing(&opts);

    if let Err(error) = run(opts) {
        error!(reason = %format!("{:?}", error), "execution failed");
        process::exit(1);
    }
}

fn setup_tracing(opts: &Opts) {
    let filter = if let Ok(filter) = env::var("RUST_LOG") {
        filter
    } else if opts.quiet {
        "pkgforge=error".to_string()
    } else if opts.trace {
        "pkgforge=trace,pkgforge_core=trace".to_string()
    } else if opts.debug {
        "pkgforge=debug,pkgforge_core=debug".to_string()
    } else {
        "pkgforge=info,pkgforge_core=info".to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

fn run(opts: Opts) -> Result<()> {
    let config_path = opts
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = if config_path.exists() {
        Configuration::load(&config_path)
            .with_context(|| format!("failed to load config `{}`", config_path.display()))?
    } else {
        Configuration::default()
    };

    match opts.command {
        Command::Build(build) => run_build(build, config),
    }
}

fn run_build(opts: BuildOpts, config: Configuration) -> Result<()> {
    let distro = DistroId::new(
        opts.distro.or(config.distro).unwrap_or_default(),
        opts.codename.or(config.codename).unwrap_or_default(),
    );

    let target_arch = match &opts.arch {
        Some(arch) => BuildArch::try_from(arch.as_str())?,
        None => BuildArch::host().context("the host architecture is not supported")?,
    };

    let target = match opts.format.or(config.format) {
        Some(format) => BuildTarget::try_from(format.as_str())?,
        None => BuildTarget::for_family(distro.family()).with_context(|| {
            format!(
                "cannot infer a package format for distro `{}`; pass --format",
                distro.distro
            )
        })?,
    };

    if let Some(version) = &opts.pkgver {
        recipe::set_override_pkgver(version);
    }
    if let Some(release) = &opts.pkgrel {
        recipe::set_override_pkgrel(release);
    }

    let mut recipe = Recipe::load(&opts.recipe, distro, target_arch)?;
    if let Some(dir) = opts.package_dir {
        recipe.dirs.package_dir = dir;
    }

    let output_dir = opts
        .output_dir
        .or(config.output_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir).context("failed to create the output directory")?;

    let path = package::create_package(&mut recipe, target, target_arch, &output_dir)?;
    println!("{}", path.display());
    Ok(())
}
