//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::net::IpAddr;
use std::path::PathBuf;

/// mdserve live markdown preview CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Markdown file to watch and preview
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub file: PathBuf,

    /// Port number to listen on (first candidate; the next free port is
    /// used when it is taken)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long, default_value = "127.0.0.1")]
    pub interface: IpAddr,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,
}
