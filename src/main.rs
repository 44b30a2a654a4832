//! graphpack - versioned bundles of named graphs
//!
//! Thin command line over the graphpack library: install bundles from a
//! statement store, fetch and deploy them through remotes and inspect the
//! local cache.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod cli;
mod commands;

use cli::{Cli, Commands};
use graphpack::config::Settings;
use graphpack::error::Result;

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Settings from the environment with command line overrides applied
fn settings_for(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load()?;
    if let Some(dir) = &cli.cache_dir {
        settings.cache_dir = dir.clone();
    }
    if let Some(dir) = &cli.remotes_dir {
        settings.remotes_dir = dir.clone();
    }
    Ok(settings)
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions(args) = cli.command {
        return commands::completions::run(args);
    }

    let settings = settings_for(&cli)?;
    match cli.command {
        Commands::Install(args) => commands::install::run(&settings, args),
        Commands::Fetch(args) => commands::fetch::run(&settings, args),
        Commands::Deploy(args) => commands::deploy::run(&settings, args),
        Commands::List => commands::list::run(&settings),
        Commands::Show(args) => commands::show::run(&settings, args),
        Commands::Remote(args) => commands::remote::run(&settings, args),
        Commands::Cache(args) => commands::cache::run(&settings, args),
        Commands::Completions(args) => commands::completions::run(args),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
