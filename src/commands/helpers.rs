//! Command helper utilities

use graphpack::cache::Cache;
use graphpack::config::{RemoteRegistry, Settings};
use graphpack::error::Result;
use graphpack::remote::RemoteClient;

pub fn open_cache(settings: &Settings) -> Result<Cache> {
    Cache::open(&settings.cache_dir)
}

/// Clients for the named remotes, in the given order.
///
/// With no names, every registered remote is used, sorted by name.
pub fn remote_clients(settings: &Settings, names: &[String]) -> Result<Vec<RemoteClient>> {
    let registry = RemoteRegistry::open(&settings.remotes_dir);
    let remotes = if names.is_empty() {
        registry.list()?
    } else {
        names
            .iter()
            .map(|name| registry.get(name))
            .collect::<Result<Vec<_>>>()?
    };
    remotes
        .iter()
        .map(|remote| RemoteClient::new(remote, settings.accessor_timeout))
        .collect()
}

/// `s` suffix for counts other than one
pub fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
