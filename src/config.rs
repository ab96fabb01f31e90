//! Runtime configuration for the preview server.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cli::Cli;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{0}`: no such file")]
    Missing(PathBuf),

    #[error("`{0}` is a directory, expected a markdown file")]
    IsDirectory(PathBuf),

    #[error("cannot resolve `{0}`")]
    Resolve(PathBuf, #[source] std::io::Error),
}

/// Validated serve configuration, built once and shared via `Arc`.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Canonical path of the watched file.
    pub file: PathBuf,
    /// Directory whose filesystem events cover the watched file.
    pub watch_root: PathBuf,
    /// File name shown in the page title and log lines.
    pub display_name: String,
    /// Interface the listener binds to.
    pub interface: IpAddr,
    /// First port candidate; the effective port may differ after retry.
    pub port: u16,
}

impl ServeConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if !cli.file.exists() {
            return Err(ConfigError::Missing(cli.file.clone()));
        }
        if cli.file.is_dir() {
            return Err(ConfigError::IsDirectory(cli.file.clone()));
        }
        let file = cli
            .file
            .canonicalize()
            .map_err(|e| ConfigError::Resolve(cli.file.clone(), e))?;

        // Watch the parent directory, not the file: editors replace the
        // file on save and a watch pinned to the old inode goes silent.
        let watch_root = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        let display_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        Ok(Self {
            file,
            watch_root,
            display_name,
            interface: cli.interface,
            port: cli.port,
        })
    }
}
