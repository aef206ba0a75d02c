//! Moodscan CLI - facial emotion detection and a supportive chat companion.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{Cli, Commands, ExitCode};
use config::AppConfig;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match cli.config {
        Some(ref path) => match AppConfig::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {e:#}");
                return ExitCode::Error.into();
            }
        },
        None => AppConfig::load(),
    };

    let outcome = match cli.command {
        Commands::Detect(args) => {
            commands::detect::run(&args.with_config(&config)).map(|result| result.exit_code)
        }
        Commands::Serve(args) => {
            commands::serve::run(&args.with_config(&config)).map(|()| ExitCode::Success)
        }
        Commands::Chat(args) => {
            commands::chat::run(&args.with_config(&config)).map(|()| ExitCode::Success)
        }
        Commands::Models(args) => {
            commands::models::run(&args.with_config(&config)).map(|()| ExitCode::Success)
        }
    };

    let exit_code = match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::Error
        }
    };

    exit_code.into()
}
