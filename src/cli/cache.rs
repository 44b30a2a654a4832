use clap::{Parser, Subcommand};

/// Arguments for cache command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show the cache location:\n    graphpack cache path\n\n\
                  Remove one installed bundle:\n    graphpack cache evict ex/a 1")]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheSubcommand {
    /// Remove an installed bundle
    Evict {
        /// Bundle id
        id: String,
        /// Version to remove
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        version: u64,
    },

    /// Print the cache directory
    Path,
}
