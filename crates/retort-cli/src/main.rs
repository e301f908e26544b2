//! Retort CLI - build loaders, dumpers and converters for declared models
//!
//! This is the main entry point for the `retort` binary, providing
//! commands for checking model declarations and for loading, dumping and
//! converting data with them.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod models;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;
use tracing_appender::non_blocking::WorkerGuard;

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    let config = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    // Set up colored output
    control::set_override(cli.use_color() && config.output.color);

    // The guard flushes file logs on exit
    let guard = match init_logging(&cli, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    match run(cli, &config) {
        Ok(()) => {}
        Err(e) => {
            drop(guard);
            exit_with(&e)
        }
    }
}

fn exit_with(e: &error::Error) -> ! {
    eprintln!("{}", error::format_error(e, control::SHOULD_COLORIZE.should_colorize()));

    if e.should_show_help() {
        eprintln!("\nFor more information, try '--help'");
    }

    process::exit(e.exit_code());
}

/// Main application logic
#[instrument(skip(cli, config), fields(command = ?cli.command))]
fn run(cli: Cli, config: &Config) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let mut output = OutputWriter::new(cli.output, cli.use_color() && config.output.color, cli.quiet);

    tracing::info!(
        command = ?cli.command,
        verbosity = cli.verbosity_level(),
        "Executing command"
    );

    match cli.command {
        Commands::Check(args) => handlers::handle_check(args, config, &mut output),
        Commands::Load(args) => handlers::handle_load(args, config, &mut output),
        Commands::Dump(args) => handlers::handle_dump(args, config, &mut output),
        Commands::Roundtrip(args) => handlers::handle_roundtrip(args, config, &mut output),
        Commands::Convert(args) => handlers::handle_convert(args, config, &mut output),
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: &Config) -> Result<Option<WorkerGuard>> {
    // Verbosity first, then the config file, then the environment
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_file(&config.logging)?;
    logging_config.merge_with_env();

    // If quiet mode, only log errors
    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(logging_config)
}
