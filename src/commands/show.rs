//! Show command implementation

use console::Style;
use graphpack::bundle::Bundle;
use graphpack::config::Settings;
use graphpack::error::Result;

use super::helpers::open_cache;
use crate::cli::ShowArgs;

pub fn run(settings: &Settings, args: ShowArgs) -> Result<()> {
    let cache = open_cache(settings)?;
    let bundle = Bundle::open(&cache, &args.id, args.version)?;
    let manifest = bundle.manifest();
    let bold = Style::new().bold();

    println!("{}", Style::new().bold().yellow().apply_to(bundle.key()));
    if let Some(name) = &manifest.name {
        println!("  {} {}", bold.apply_to("Name:"), name);
    }
    if let Some(description) = &manifest.description {
        println!("  {} {}", bold.apply_to("Description:"), description);
    }
    println!("  {} {}", bold.apply_to("Path:"), bundle.installed().path.display());
    println!("  {} {}", bold.apply_to("Content hash:"), manifest.content_hash);

    println!("  {}", bold.apply_to("Contexts:"));
    for context in bundle.contexts() {
        println!("    {context}");
    }

    if !manifest.files.is_empty() {
        println!("  {}", bold.apply_to("Files:"));
        for file in &manifest.files {
            println!("    {}", file.path);
        }
    }

    if !bundle.dependencies().is_empty() {
        println!("  {}", bold.apply_to("Dependencies:"));
        for dep in bundle.dependencies() {
            println!("    {}", Style::new().cyan().apply_to(dep.key()));
            for excluded in &dep.excludes {
                println!("      {} {}", Style::new().dim().apply_to("excludes"), excluded);
            }
        }

        println!("  {}", bold.apply_to("Imported contexts:"));
        for (context, owner) in bundle.composition()? {
            if &owner != bundle.key() {
                println!("    {} {}", context, Style::new().dim().apply_to(format!("from {owner}")));
            }
        }
    }
    Ok(())
}
