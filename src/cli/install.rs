use clap::Parser;
use std::path::PathBuf;

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Capture a bundle:\n    graphpack install bundle.yaml --store data.nq\n\n\
                  Copy files from another project root:\n    graphpack install bundle.yaml --store data.nq --project ./site")]
pub struct InstallArgs {
    /// Bundle descriptor (YAML)
    pub descriptor: PathBuf,

    /// Statement store to capture contexts from (N-Quads)
    #[arg(long, short = 's')]
    pub store: PathBuf,

    /// Root for the descriptor's file includes (defaults to the descriptor's directory)
    #[arg(long, short = 'p')]
    pub project: Option<PathBuf>,

    /// Remote to fetch missing dependencies from, in order (defaults to all remotes)
    #[arg(long = "remote", short = 'r', value_name = "NAME")]
    pub remotes: Vec<String>,
}
