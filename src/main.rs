mod cli;
mod logging;
mod reporter;

use clap::Parser;
use cli::Cli;
use colored::*;
use dotenv::dotenv;
use reporter::CliReporter;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use tidy_up::config::load_configuration;
use tidy_up::{ConfigOrigin, Engine, Prompter};
use tracing::{debug, error};

fn main() -> ExitCode {
    dotenv().ok();

    let _guard = logging::init_logger();

    if !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let args = Cli::parse();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> anyhow::Result<ExitCode> {
    let (config, origin) = match load_configuration(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) if err.is_fatal() => {
            eprintln!("{} Exiting.", err.to_string().red());
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => return Err(err.into()),
    };
    if let (ConfigOrigin::FallbackDefault(err), Some(path)) = (&origin, &args.config) {
        if err.kind() == io::ErrorKind::NotFound {
            println!(
                "Configuration file was not found at {}. Using default configuration.",
                path.display()
            );
        } else {
            println!(
                "Configuration file at {} could not be read ({}). Using default configuration.",
                path.display(),
                err
            );
        }
    }

    let operations = args.operations();
    let engine = Engine::new(config, args.main_dir, args.directories);
    debug!("Configuration: {:?}", engine.config());
    debug!("Selected operations: {:?}", operations);

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());
    engine.print_header(&mut prompter)?;

    let summary = engine.run(&operations, &mut prompter, &CliReporter::new())?;
    debug!("{} phases run, {} aborted", summary.phases.len(), summary.aborted().count());

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
