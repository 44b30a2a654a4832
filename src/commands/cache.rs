//! Cache command implementation

use graphpack::config::Settings;
use graphpack::error::{Result, bundle};

use super::helpers::open_cache;
use crate::cli::{CacheArgs, CacheSubcommand};

pub fn run(settings: &Settings, args: CacheArgs) -> Result<()> {
    match args.command {
        CacheSubcommand::Evict { id, version } => {
            let cache = open_cache(settings)?;
            if !cache.evict(&id, version)? {
                return Err(bundle::not_found(&id, Some(version)));
            }
            println!("Evicted {id}@{version}");
        }
        CacheSubcommand::Path => println!("{}", settings.cache_dir.display()),
    }
    Ok(())
}
