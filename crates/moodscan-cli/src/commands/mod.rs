//! CLI command definitions and handlers.

pub mod chat;
pub mod detect;
pub mod models;
pub mod pipeline;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Moodscan - facial emotion detection and a supportive chat companion
#[derive(Parser)]
#[command(name = "moodscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Read configuration from this file instead of the XDG and project files
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Detect the emotion on faces in image files
    Detect(detect::DetectArgs),
    /// Serve detection and chat over HTTP
    Serve(serve::ServeArgs),
    /// Send one chat message and print the reply
    Chat(chat::ChatArgs),
    /// Manage ML models
    Models(models::ModelsArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every image had a face.
    Success = 0,
    /// At least one image had no face.
    NoFace = 1,
    /// The command failed.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
