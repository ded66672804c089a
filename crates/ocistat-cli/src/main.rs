//! ocistat CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ocistat_cli::cmd;
use ocistat_cli::cmd::copy::Mode;
use ocistat_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so status lines on stdout stay clean
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = cli.settings();
    match cli.command {
        Commands::Copy { from, to, digest } => {
            cmd::copy::copy(&from, &to, &digest, Mode::Copy, settings).await
        }
        Commands::Backup { from, to, digest } => {
            cmd::copy::copy(&from, &to, &digest, Mode::Backup, settings).await
        }
        Commands::Restore { from, to, digest } => {
            cmd::copy::copy(&from, &to, &digest, Mode::Restore, settings).await
        }
        Commands::PushBlob {
            layout,
            file,
            media_type,
        } => cmd::push_blob::push_blob(&layout, &file, &media_type, settings).await,
    }
}
