use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    graphpack completions bash > ~/.bash_completion.d/graphpack\n\n\
                  Generate zsh completions:\n    graphpack completions zsh > ~/.zfunc/_graphpack\n\n\
                  Generate fish completions:\n    graphpack completions fish > ~/.config/fish/completions/graphpack.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    pub shell: String,
}
