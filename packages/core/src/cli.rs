use clap::Parser;

use crate::config::Config;

/// Site Gallery CLI arguments. Flags override the environment.
#[derive(Debug, Parser)]
#[command(
    name = "site-gallery",
    version,
    about = "Gallery backend for hosted sites with operator exclusions"
)]
pub struct Cli {
    /// Database connection string (e.g. sqlite://gallery.db)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Address the HTTP server binds to
    #[arg(long)]
    pub bind: Option<String>,

    /// Run the hosting sync every N seconds in the background
    #[arg(long)]
    pub sync_interval: Option<u64>,

    /// Do not apply database migrations on startup
    #[arg(long)]
    pub skip_migrations: bool,
}

impl Cli {
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(secs) = self.sync_interval.filter(|secs| *secs > 0) {
            config.sync_interval_seconds = Some(secs);
        }
    }
}
