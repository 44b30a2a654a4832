//! List command implementation

use console::Style;
use graphpack::config::Settings;
use graphpack::error::Result;

use super::helpers::{open_cache, plural};

pub fn run(settings: &Settings) -> Result<()> {
    let cache = open_cache(settings)?;
    let bundles = cache.list()?;

    if bundles.is_empty() {
        println!("No bundles installed.");
        return Ok(());
    }

    println!("Installed bundles ({}):", bundles.len());
    for bundle in &bundles {
        let manifest = &bundle.manifest;
        println!(
            "  {} {}",
            Style::new().bold().yellow().apply_to(&bundle.key),
            Style::new()
                .dim()
                .apply_to(format!(
                    "({} context{}, {} file{}, {} dependenc{})",
                    manifest.contexts.len(),
                    plural(manifest.contexts.len()),
                    manifest.files.len(),
                    plural(manifest.files.len()),
                    manifest.dependencies.len(),
                    if manifest.dependencies.len() == 1 { "y" } else { "ies" },
                ))
        );
    }
    Ok(())
}
