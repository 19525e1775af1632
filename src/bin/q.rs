// src/bin/q.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use q::{
    cli::{
        Cli,
        dispatcher::{Dispatcher, Outcome},
        help,
    },
    core::{
        conversation_store::JsonFileStore, paths, registry::Registry, settings::Settings,
    },
    system::{clipboard, openai::OpenAiProvider, presenter::TerminalPresenter},
};

/// The main entry point of the `q` application.
/// It sets up logging, parses arguments, dispatches, and performs centralized error handling.
fn main() {
    env_logger::init();

    if clipboard::is_daemon() {
        if let Err(e) = clipboard::serve_from_stdin() {
            log::debug!("{}", e);
        }
        return;
    }

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Wires the real collaborators together and runs one invocation.
fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let settings = Settings::load_or_create(&paths::get_settings_path()?)?
        .with_env(|name| std::env::var(name).ok());
    let registry = Registry::builtin(&settings)?;

    let store = JsonFileStore::new(settings.conversation_path(&paths::get_data_dir()?)?);
    let provider = OpenAiProvider::from_settings(&settings)?;
    let mut presenter = TerminalPresenter::new();

    let mut dispatcher = Dispatcher::new(&registry, &settings, &store, &provider, &mut presenter);
    if dispatcher.dispatch(&cli.args)? == Outcome::Help {
        println!("{}", help::render_help(&registry));
    }
    Ok(())
}
