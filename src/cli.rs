use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "treesync")]
#[command(about = "Mirror directory trees between local disk and a remote file store", version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/treesync/treesync.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Remote profile to use instead of the configured default
    #[arg(short, long, global = true)]
    pub remote: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mirror a remote directory into a local directory, skipping entries already present
    Download { remote: String, local: PathBuf },

    /// Download a single remote file
    Get { remote: String, local: PathBuf },

    /// Upload a local file or directory under a remote parent
    Upload {
        local: PathBuf,

        #[arg(short, long, default_value = "/")]
        parent: String,

        /// Keep existing remote files instead of replacing them
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Recursively list a remote directory
    List {
        remote: String,

        #[arg(long)]
        json: bool,
    },

    /// Total bytes under a remote path
    Size { remote: String },

    /// Total bytes under a local path
    LocalSize { path: PathBuf },

    /// Last modification time of a remote file
    Modified { remote: String },

    /// Create a remote directory
    Mkdir { remote: String },

    /// Show configured remotes
    Remotes,
}
