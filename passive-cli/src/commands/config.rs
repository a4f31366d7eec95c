//! Config command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to an activation config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the collector endpoint
    #[arg(long)]
    pub api_url: Option<String>,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match config::resolve(args.config.as_deref(), args.api_url.as_deref())? {
        Some(resolved) => {
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        None => {
            println!("No activation config found; instrumentation would be inert.");
            println!("Looked for:");
            println!("  {}", config::project_config_path().display());
            if let Some(user) = config::user_config_path() {
                println!("  {}", user.display());
            }
        }
    }
    Ok(())
}
