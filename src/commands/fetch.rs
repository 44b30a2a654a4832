//! Fetch command implementation

use console::{Style, Term};
use graphpack::cache::RepositoryIndex;
use graphpack::config::Settings;
use graphpack::error::Result;
use graphpack::operations::Fetcher;

use super::helpers::{open_cache, remote_clients};
use crate::cli::FetchArgs;

pub fn run(settings: &Settings, args: FetchArgs) -> Result<()> {
    let cache = open_cache(settings)?;
    let remotes = remote_clients(settings, &args.remotes)?;
    let index = RepositoryIndex::new(settings.index_ttl);

    let report = Fetcher::new(&cache, &index, &remotes)
        .with_progress(Term::stderr().is_term())
        .fetch(&args.id, args.version)?;

    if report.installed.is_empty() {
        println!("{} is already in the cache", report.bundle.key);
    }
    for key in &report.installed {
        println!("{} {}", Style::new().green().bold().apply_to("Fetched"), key);
    }
    Ok(())
}
