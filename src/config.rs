//! Configuration management for the PDF editor core.
//!
//! Handles:
//! - Command-line argument parsing
//! - Optional TOML config file (explicit path, project, or user config dir)

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const PROJECT_CONFIG_FILE: &str = ".pdfeditor.toml";

/// Command-line arguments for the pdfeditor host
#[derive(Debug, Default, Parser)]
#[command(name = "pdfeditor")]
#[command(about = "Open a PDF document and report its structure")]
#[command(version)]
pub struct Args {
    /// Document to open; read from stdin when omitted
    pub locator: Option<String>,

    /// Open the document with write access
    #[arg(long)]
    pub read_write: bool,

    /// Explicit configuration file
    #[arg(long, help = "Path to a pdfeditor TOML config file")]
    pub config: Option<PathBuf>,

    /// Log level for the host
    #[arg(long, help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,

    /// Print the document summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Session manager tuning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Documents larger than this are refused at open
    pub max_document_bytes: Option<u64>,
    /// fsync staged bytes before the atomic rename and the directory after it
    pub durable_commits: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: None,
            durable_commits: true,
        }
    }
}

/// On-disk config file layout
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub log_level: Option<String>,
    pub session: SessionConfig,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config file {}", path.display()))
    }
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub locator: Option<String>,
    pub read_write: bool,
    pub json: bool,
    pub log_level: String,
    pub session: SessionConfig,
    /// Config file that was loaded, if any
    pub config_path: Option<PathBuf>,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        let config_path = match args.config {
            Some(path) => Some(path),
            None => Self::discover_config_file(),
        };

        let file = match &config_path {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        // CLI wins over the file
        let log_level = args
            .log_level
            .or(file.log_level)
            .unwrap_or_else(|| "info".to_string());

        Ok(Config {
            locator: args.locator,
            read_write: args.read_write,
            json: args.json,
            log_level,
            session: file.session,
            config_path,
        })
    }

    /// Project config in the working directory, then the user config dir
    fn discover_config_file() -> Option<PathBuf> {
        let project = PathBuf::from(PROJECT_CONFIG_FILE);
        if project.is_file() {
            return Some(project);
        }

        dirs::config_dir()
            .map(|dir| dir.join("pdfeditor").join("config.toml"))
            .filter(|path| path.is_file())
    }

    pub fn has_config_file(&self) -> bool {
        self.config_path.is_some()
    }
}
