use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use mkdown::{App, Cli, Commands, Config, NoteStore, Result};

pub fn initialize_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref(), cli.notes_dir)?;

    if let Commands::Init = cli.command {
        let store = NoteStore::init(&config.notes_dir)?;
        println!("Initialized notes directory at {}", store.index_path().display());
        return Ok(());
    }

    let store = NoteStore::open(&config.notes_dir)?;
    App::new(store, config, cli.verbose).run(cli.command)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            if let mkdown::MkError::CorruptIndex { .. } = e {
                eprintln!("Run `mkdown init` to create a notes directory, or repair the index file.");
            }
            ExitCode::FAILURE
        }
    }
}
