//! Install command implementation

use std::path::{Path, PathBuf};

use console::Style;
use graphpack::cache::{InstallOutcome, RepositoryIndex};
use graphpack::config::{Descriptor, Settings};
use graphpack::error::Result;
use graphpack::installer::Installer;
use graphpack::store::nquads;

use super::helpers::{open_cache, plural, remote_clients};
use crate::cli::InstallArgs;

pub fn run(settings: &Settings, args: InstallArgs) -> Result<()> {
    let descriptor = Descriptor::load(&args.descriptor)?;
    let store = nquads::load_store(&args.store)?;
    let project = args
        .project
        .unwrap_or_else(|| project_root_of(&args.descriptor));

    let cache = open_cache(settings)?;
    let remotes = remote_clients(settings, &args.remotes)?;
    let index = RepositoryIndex::new(settings.index_ttl);
    let report = Installer::new(&cache)
        .with_remotes(&remotes, &index)
        .install(&descriptor, &store, &project)?;
    let manifest = &report.bundle.manifest;

    match report.outcome {
        InstallOutcome::Installed => println!(
            "{} {} ({} context{}, {} file{})",
            Style::new().green().bold().apply_to("Installed"),
            report.bundle.key,
            manifest.contexts.len(),
            plural(manifest.contexts.len()),
            manifest.files.len(),
            plural(manifest.files.len()),
        ),
        InstallOutcome::AlreadyPresent => println!(
            "{} is already installed with identical content",
            report.bundle.key
        ),
    }
    if !report.covered.is_empty() {
        println!(
            "  {} context{} provided by dependencies",
            report.covered.len(),
            plural(report.covered.len())
        );
    }
    Ok(())
}

fn project_root_of(descriptor: &Path) -> PathBuf {
    match descriptor.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
