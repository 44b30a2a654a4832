//! Deploy command implementation

use console::Style;
use graphpack::config::Settings;
use graphpack::error::{Result, config};
use graphpack::operations::Deployer;

use super::helpers::{open_cache, remote_clients};
use crate::cli::DeployArgs;

pub fn run(settings: &Settings, args: DeployArgs) -> Result<()> {
    let cache = open_cache(settings)?;
    let remotes = remote_clients(settings, &args.remotes)?;
    if remotes.is_empty() {
        return Err(config::invalid(
            "no remotes configured; add one with 'graphpack remote add'",
        ));
    }

    let deployer = Deployer::new(&cache, &remotes);
    let report = match (&args.archive, &args.id) {
        (Some(archive), _) => deployer.deploy_archive(archive)?,
        (None, Some(id)) => deployer.deploy(id, args.version)?,
        (None, None) => return Err(config::invalid("a bundle id or --archive is required")),
    };
    for remote in report.succeeded() {
        println!(
            "{} {} to {}",
            Style::new().green().bold().apply_to("Deployed"),
            report.key,
            remote
        );
    }
    for (remote, error) in report.failed() {
        eprintln!(
            "{} {} to {}: {}",
            Style::new().red().bold().apply_to("Failed"),
            report.key,
            remote,
            error
        );
    }

    match report.outcomes.into_iter().find_map(|o| o.result.err()) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
