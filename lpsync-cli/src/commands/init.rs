//! `lpsync init`: write the default settings file.

use anyhow::{Context, Result};
use clap::Args;

use lpsync_core::config;

/// Create `~/.lpsync/config.yaml` with commented defaults.
#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let (path, created) = config::init().context("failed to write default settings")?;
        if created {
            println!("✓ Wrote default settings to {}", path.display());
            println!("  Edit project, tag and team, then run `lpsync plan`.");
        } else {
            println!("✓ Settings already exist at {} (left untouched)", path.display());
        }
        Ok(())
    }
}
