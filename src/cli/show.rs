use clap::Parser;

/// Arguments for the show command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show the newest installed version:\n    graphpack show ex/a\n\n\
                  Show a specific version:\n    graphpack show ex/a --version 1")]
pub struct ShowArgs {
    /// Bundle id
    pub id: String,

    /// Installed version (defaults to the highest)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub version: Option<u64>,
}
