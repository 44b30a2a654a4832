//! Remote command implementation

use console::Style;
use graphpack::config::{AccessorConfig, RemoteRegistry, Settings};
use graphpack::error::Result;

use crate::cli::{RemoteArgs, RemoteSubcommand};

pub fn run(settings: &Settings, args: RemoteArgs) -> Result<()> {
    let registry = RemoteRegistry::open(&settings.remotes_dir);
    match args.command {
        RemoteSubcommand::Add { name, url } => {
            let accessor = AccessorConfig::from_url(&url)?;
            let location = accessor.describe();
            if registry.add(&name, accessor)? {
                println!("Added {location} to remote '{name}'");
            } else {
                println!("Remote '{name}' already has {location}");
            }
        }
        RemoteSubcommand::List => {
            let remotes = registry.list()?;
            if remotes.is_empty() {
                println!("No remotes configured.");
            }
            for remote in remotes {
                println!("{}", Style::new().bold().yellow().apply_to(&remote.name));
                for accessor in &remote.accessor_configs {
                    println!(
                        "  {} {}",
                        Style::new().cyan().apply_to(accessor.protocol()),
                        accessor.describe()
                    );
                }
            }
        }
        RemoteSubcommand::Remove { name } => {
            registry.remove(&name)?;
            println!("Removed remote '{name}'");
        }
    }
    Ok(())
}
