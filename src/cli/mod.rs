// src/cli/mod.rs

use clap::Parser;

pub mod dispatcher;
pub mod help;

/// q: An LLM-powered programming copilot from the comfort of your command line.
#[derive(Parser, Debug)]
#[command(author, version, about)]
// Every flag, including `-h`, is classified by `core::arg_parser`, so clap
// must not claim any of them.
#[command(
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// The raw arguments passed to q: `[command] TEXT... [options...]`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
