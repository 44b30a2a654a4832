//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - install: Install command arguments
//! - fetch: Fetch command arguments
//! - deploy: Deploy command arguments
//! - show: Show command arguments
//! - remote: Remote registry subcommands
//! - cache: Cache subcommands
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod cache;
pub mod completions;
pub mod deploy;
pub mod fetch;
pub mod install;
pub mod remote;
pub mod show;

pub use cache::{CacheArgs, CacheSubcommand};
pub use completions::CompletionsArgs;
pub use deploy::DeployArgs;
pub use fetch::FetchArgs;
pub use install::InstallArgs;
pub use remote::{RemoteArgs, RemoteSubcommand};
pub use show::ShowArgs;

/// graphpack - versioned bundles of named graphs
#[derive(Parser, Debug)]
#[command(
    name = "graphpack",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Package, cache and distribute versioned bundles of named graphs",
    long_about = "graphpack captures selected contexts of a statement store, together with \
                  project files, into immutable versioned bundles, keeps them in a local cache \
                  and moves them to and from remotes over file, HTTP and SFTP.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  graphpack install bundle.yaml --store data.nq  \x1b[90m# Capture a bundle\x1b[0m\n   \
                  graphpack remote add origin /srv/bundles      \x1b[90m# Register a remote\x1b[0m\n   \
                  graphpack deploy ex/a                          \x1b[90m# Publish to all remotes\x1b[0m\n   \
                  graphpack fetch ex/a --version 2               \x1b[90m# Fetch with dependencies\x1b[0m\n   \
                  graphpack show ex/a                            \x1b[90m# Show bundle information\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Local bundle cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Directory holding remote definitions
    #[arg(long, global = true)]
    pub remotes_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture a bundle from a descriptor and a statement store
    Install(InstallArgs),

    /// Fetch a bundle and its dependencies from remotes
    Fetch(FetchArgs),

    /// Upload an installed bundle to remotes
    Deploy(DeployArgs),

    /// List installed bundles
    List,

    /// Show bundle information
    Show(ShowArgs),

    /// Manage remotes
    Remote(RemoteArgs),

    /// Manage the local cache
    Cache(CacheArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
