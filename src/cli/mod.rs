//! Command-line interface for bt-export
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading, overriding and validation
//! - Resolving the project to export (argument or prompt)
//! - Subcommands (version, completion, config)

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::{Config, LogLevel};
use crate::error::{ConfigError, Result};
use crate::utils::fs::expand_home;

pub mod completion;

/// Export Braintrust project data to CSV
#[derive(Parser, Debug)]
#[command(
    name = "bt-export",
    version,
    about = "Export project datasets and experiments to CSV files",
    long_about = "Fetches every dataset and experiment of a project, including their rows
and logs, and writes one CSV file per entity under
exports/<project>/{datasets,experiments}/.

The API key is read from the environment variable named by api.api_key_env
(BRAINTRUST_API_KEY by default)."
)]
pub struct CliArgs {
    /// Project ID to export (prompted for when omitted)
    #[arg(value_name = "PROJECT_ID")]
    pub project_id: Option<String>,

    /// API base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Rows requested per BTQL page
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Root directory for exported files
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only, no progress bar)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Do not run traceroute after request timeouts
    #[arg(long)]
    pub no_diagnostics: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for bt-export
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from the process arguments
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file, apply arguments, validate
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether to draw a progress bar
    pub fn show_progress(&self) -> bool {
        !(self.args.no_progress || self.args.quiet)
    }

    /// Config file path in effect
    pub fn config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }

    /// Apply CLI arguments to configuration
    ///
    /// # Arguments
    /// * `config` - Configuration to modify
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_api_args(config, args);
        Self::apply_export_args(config, args);
        Self::apply_logging_args(config, args);

        if args.no_diagnostics {
            config.diagnostics.traceroute = false;
        }
    }

    /// Apply API-related CLI arguments to configuration
    fn apply_api_args(config: &mut Config, args: &CliArgs) {
        if let Some(ref url) = args.base_url {
            config.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            config.api.timeout = timeout;
        }
    }

    /// Apply export-related CLI arguments to configuration
    fn apply_export_args(config: &mut Config, args: &CliArgs) {
        if let Some(page_size) = args.page_size {
            config.export.page_size = page_size;
        }
        if let Some(ref dir) = args.output_dir {
            config.export.output_dir = expand_home(dir);
        }
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Resolve the project ID from the argument, or prompt for it on stdin
    pub fn project_id(&self) -> Result<String> {
        if let Some(ref id) = self.args.project_id {
            return Self::non_empty_project_id(id);
        }

        print!("Enter the project ID: ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Self::non_empty_project_id(&line)
    }

    fn non_empty_project_id(raw: &str) -> Result<String> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(ConfigError::MissingField("project id".into()).into());
        }
        Ok(id.to_string())
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if subcommand was handled, false to continue
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Version) => {
                self.show_version();
                Ok(true)
            }
            Some(Commands::Completion { shell }) => {
                completion::generate_completion(shell)?;
                Ok(true)
            }
            Some(Commands::Config { show }) => {
                if *show {
                    self.show_config()?;
                } else {
                    println!("Configuration file: {}", self.config_path().display());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Show version information
    fn show_version(&self) {
        println!("bt-export version {}", env!("CARGO_PKG_VERSION"));
    }

    /// Show effective configuration
    ///
    /// The API key itself is never part of the configuration.
    fn show_config(&self) -> Result<()> {
        let path = self.config_path();
        println!("Configuration file: {}{}", path.display(), Self::missing_suffix(&path));
        println!();
        println!("{}", self.config.to_toml_string()?);
        Ok(())
    }

    fn missing_suffix(path: &Path) -> &'static str {
        if path.exists() { "" } else { " (not found, using defaults)" }
    }
}
