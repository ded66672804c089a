//! ocistat - copy OCI layouts with deduplicated status output
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Every distinct blob or manifest gets exactly one status line per run,
//! however many manifests share it. On a terminal, in-flight transfers are
//! drawn in a live block below the status lines.

pub mod cmd;

use clap::{Parser, Subcommand};
use ocistat_core::Console;
use ocistat_core::engine::{CopyOptions, DEFAULT_CONCURRENCY};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ocistat")]
#[command(author, version, about = "ocistat - copy OCI layouts with deduplicated status output")]
pub struct Cli {
    /// Number of blobs transferred at once
    #[arg(long, global = true, env = "OCISTAT_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Print plain status lines even on a terminal
    #[arg(long, global = true, env = "OCISTAT_NO_TTY")]
    pub no_tty: bool,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Output settings shared by every command.
    pub fn settings(&self) -> Settings {
        Settings {
            concurrency: self.concurrency,
            no_tty: self.no_tty,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy a graph from one layout to another
    Copy {
        /// Source layout directory
        from: PathBuf,
        /// Destination layout directory (created if missing)
        to: PathBuf,
        /// Digest of the root manifest, index or blob
        digest: String,
    },
    /// Back up a graph into a local layout
    Backup {
        /// Source layout directory
        from: PathBuf,
        /// Backup layout directory (created if missing)
        to: PathBuf,
        /// Digest of the root manifest, index or blob
        digest: String,
    },
    /// Restore a graph from a backup layout
    Restore {
        /// Backup layout directory
        from: PathBuf,
        /// Destination layout directory (created if missing)
        to: PathBuf,
        /// Digest of the root manifest, index or blob
        digest: String,
    },
    /// Push a single file into a layout as a blob
    #[command(name = "push-blob")]
    PushBlob {
        /// Layout directory (created if missing)
        layout: PathBuf,
        /// File to push
        file: PathBuf,
        /// Media type recorded for the blob
        #[arg(long, default_value = ocistat_schema::media_type::OCTET_STREAM)]
        media_type: String,
    },
}

/// Global settings resolved from flags and environment.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub concurrency: usize,
    pub no_tty: bool,
}

impl Settings {
    /// Console status lines go to.
    pub fn console(&self) -> Console {
        let console = Console::stdout();
        if self.no_tty { console.plain() } else { console }
    }

    pub fn copy_options(&self) -> CopyOptions {
        CopyOptions {
            concurrency: self.concurrency,
        }
    }
}
