//! Configuration inspection.

use clap::Args;
use ponder_config::{CONFIG_FILE_NAME, Settings, ensure_user_config_dir, user_config_file};
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    /// Print the user config file path
    #[arg(long, conflicts_with_all = ["default", "config", "init"])]
    path: bool,

    /// Print the built-in defaults
    #[arg(long, conflicts_with_all = ["config", "init"])]
    default: bool,

    /// Write the defaults to the user config file if it does not exist
    #[arg(long, conflicts_with = "config")]
    init: bool,

    /// Show this file instead of the user config
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init() -> anyhow::Result<()> {
    let path = ensure_user_config_dir()?.join(CONFIG_FILE_NAME);
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    Settings::default().save(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    if args.path {
        println!("{}", user_config_file().display());
        return Ok(());
    }
    if args.init {
        return init();
    }

    let settings = if args.default {
        Settings::default()
    } else if let Some(path) = &args.config {
        Settings::load(path)?
    } else {
        Settings::load_or_default()?
    };

    if let Err(e) = settings.validate() {
        tracing::warn!(error = %e, "configuration is invalid");
    }

    print!("{}", settings.to_toml()?);
    Ok(())
}
