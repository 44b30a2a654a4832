use std::path::PathBuf;

use clap::Parser;

/// Arguments for the deploy command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Deploy the newest installed version everywhere:\n    graphpack deploy ex/a\n\n\
                  Deploy one version to one remote:\n    graphpack deploy ex/a --version 2 --remote origin\n\n\
                  Deploy an archive built elsewhere:\n    graphpack deploy --archive ex-a.tar.gz")]
pub struct DeployArgs {
    /// Bundle id
    #[arg(required_unless_present = "archive")]
    pub id: Option<String>,

    /// Installed version to deploy (defaults to the highest)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub version: Option<u64>,

    /// Deploy this archive file instead of an installed bundle
    #[arg(long, value_name = "FILE", conflicts_with_all = ["id", "version"])]
    pub archive: Option<PathBuf>,

    /// Remote to deploy to (defaults to all remotes)
    #[arg(long = "remote", short = 'r', value_name = "NAME")]
    pub remotes: Vec<String>,
}
