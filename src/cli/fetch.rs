use clap::Parser;

/// Arguments for the fetch command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Fetch the newest version from any remote:\n    graphpack fetch ex/a\n\n\
                  Fetch one version from one remote:\n    graphpack fetch ex/a --version 2 --remote origin")]
pub struct FetchArgs {
    /// Bundle id
    pub id: String,

    /// Version to fetch (defaults to the highest available)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub version: Option<u64>,

    /// Remote to fetch from, in order (defaults to all remotes)
    #[arg(long = "remote", short = 'r', value_name = "NAME")]
    pub remotes: Vec<String>,
}
