use std::{path::PathBuf, time::Duration};

use clap::Parser;
use prism_ngin::{
    Variant,
    config::Overrides,
    host::{self, HostOptions},
};

/// User-specified command line parameters
#[derive(Debug, Parser)]
#[clap(name = "prism", about)]
struct Args {
    #[clap(long, default_value = "twin-dragons")]
    /// Built-in scene to show. `--list` prints the available names.
    variant: String,

    #[clap(long, short = 'c')]
    /// TOML file with `[options]`, `[camera]` and `[controls]` overrides.
    config: Option<PathBuf>,

    #[clap(long, short = 'a', default_value = "assets")]
    /// Directory the scene's HDR, normal map and GLB files are read from.
    assets: PathBuf,

    #[clap(long, default_value_t = 30)]
    /// Give up on an asset after this many seconds.
    timeout_secs: u64,

    #[clap(long)]
    /// Print the built-in variants and exit.
    list: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.list {
        for name in Variant::names() {
            println!("{name}");
        }
        return Ok(());
    }

    let mut variant = Variant::builtin(&args.variant)?;
    if let Some(path) = &args.config {
        let source = std::fs::read_to_string(path)?;
        let overrides = Overrides::from_toml_str(&source)?;
        variant.options = overrides.apply_options(&variant.options)?;
        if let Some(camera) = overrides.camera {
            variant.camera = camera;
        }
        if let Some(controls) = overrides.controls {
            variant.controls = controls;
        }
        variant.options.validate()?;
    }

    host::run(HostOptions {
        variant,
        assets: args.assets,
        timeout: Duration::from_secs(args.timeout_secs),
    })
}
