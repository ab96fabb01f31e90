//! mdserve - live-reloading preview server for a single markdown file.

mod actor;
mod cache;
mod cli;
mod config;
mod embed;
mod logger;
mod render;
mod server;
mod state;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};

use cache::RenderCache;
use cli::Cli;
use config::ServeConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    state::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Arc::new(ServeConfig::from_cli(&cli)?);
    let cache = Arc::new(RenderCache::new());

    // First render happens before the listener accepts requests, so the
    // initial /html response is already populated. An unreadable file is
    // not fatal; the preview stays empty until the first good read.
    match std::fs::read_to_string(&config.file) {
        Ok(text) => cache.update(&text),
        Err(e) => log!("render"; "initial read of {} failed: {}", config.file.display(), e),
    }

    let bound = server::bind_server(&config)?;
    bound.run(config, cache)
}
