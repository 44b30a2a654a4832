use clap::{Parser, Subcommand};

/// Arguments for remote command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Add a directory remote:\n    graphpack remote add origin /srv/bundles\n\n\
                  Add an HTTP mirror to the same remote:\n    graphpack remote add origin https://bundles.example.org/index.json\n\n\
                  Add an SFTP remote:\n    graphpack remote add upstream sftp://deploy@example.org/srv/bundles")]
pub struct RemoteArgs {
    #[command(subcommand)]
    pub command: RemoteSubcommand,
}

/// Remote subcommands
#[derive(Subcommand, Debug)]
pub enum RemoteSubcommand {
    /// Add a remote, or another accessor to an existing one
    Add {
        /// Remote name
        name: String,
        /// Directory path, file://, http(s):// index URL or sftp:// URL
        url: String,
    },

    /// List remotes
    List,

    /// Remove a remote
    Remove {
        /// Remote name
        name: String,
    },
}
