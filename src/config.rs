//! Command-line configuration.
//!
//! Two subcommands share one binary:
//!
//! - `hive serve [PATH]` runs the development server for the project at
//!   `PATH` (default: current directory)
//! - `hive upload [PATH]` packages the project and publishes it
//!
//! # Environment Variables
//!
//! Every option can also be set with a `HIVE_` prefixed variable:
//!
//! - `HIVE_HOST` - Server bind address (default: 127.0.0.1)
//! - `HIVE_PORT` - Server port (default: 8080)
//! - `HIVE_POLL_INTERVAL_MS` - Asset watcher poll interval (default: 1000)
//! - `HIVE_SASS_BIN`, `HIVE_STYLUS_BIN`, `HIVE_LESSC_BIN`, `HIVE_COFFEE_BIN` -
//!   compiler programs
//! - `HIVE_API_ENDPOINT` - API base URL (default: https://api.markuphive.com)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::api::DEFAULT_API_ENDPOINT;
use crate::assets::CompilerCommands;
use crate::project::ProjectLayout;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default asset poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Local development server and deploy tool for hosted sites.
#[derive(Parser, Debug, Clone)]
#[command(name = "hive")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the project locally, recompiling assets as they change.
    Serve(ServeConfig),

    /// Package the project and publish it.
    Upload(UploadConfig),
}

/// Options for `hive serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Project directory.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    // =========================================================================
    // Server
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HIVE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "HIVE_PORT")]
    pub port: u16,

    // =========================================================================
    // Assets
    // =========================================================================
    /// Milliseconds between asset scans.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS, env = "HIVE_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// Sass compiler for .scss and .sass files.
    #[arg(long, default_value = "sass", env = "HIVE_SASS_BIN")]
    pub sass_bin: String,

    /// Stylus compiler for .styl files.
    #[arg(long, default_value = "stylus", env = "HIVE_STYLUS_BIN")]
    pub stylus_bin: String,

    /// Less compiler for .less files.
    #[arg(long, default_value = "lessc", env = "HIVE_LESSC_BIN")]
    pub lessc_bin: String,

    /// CoffeeScript compiler for .coffee files.
    #[arg(long, default_value = "coffee", env = "HIVE_COFFEE_BIN")]
    pub coffee_bin: String,

    // =========================================================================
    // API
    // =========================================================================
    /// API base URL used by template CMS helpers.
    #[arg(long, default_value = DEFAULT_API_ENDPOINT, env = "HIVE_API_ENDPOINT")]
    pub api_endpoint: String,

    // =========================================================================
    // Logging
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.path.is_dir() {
            return Err(format!(
                "Project directory {} does not exist",
                self.path.display()
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
        }

        for (flag, program) in [
            ("--sass-bin", &self.sass_bin),
            ("--stylus-bin", &self.stylus_bin),
            ("--lessc-bin", &self.lessc_bin),
            ("--coffee-bin", &self.coffee_bin),
        ] {
            if program.trim().is_empty() {
                return Err(format!("{} must not be empty", flag));
            }
        }

        validate_endpoint(&self.api_endpoint)
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.path)
    }

    pub fn compiler_commands(&self) -> CompilerCommands {
        CompilerCommands {
            sass: self.sass_bin.clone(),
            stylus: self.stylus_bin.clone(),
            lessc: self.lessc_bin.clone(),
            coffee: self.coffee_bin.clone(),
        }
    }
}

/// Options for `hive upload`.
#[derive(Args, Debug, Clone)]
pub struct UploadConfig {
    /// Project directory.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// API base URL.
    #[arg(long, default_value = DEFAULT_API_ENDPOINT, env = "HIVE_API_ENDPOINT")]
    pub api_endpoint: String,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl UploadConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.path.is_dir() {
            return Err(format!(
                "Project directory {} does not exist",
                self.path.display()
            ));
        }
        validate_endpoint(&self.api_endpoint)
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.path)
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), String> {
    match url::Url::parse(endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(format!(
            "API endpoint must use http or https, got {}",
            url.scheme()
        )),
        Err(e) => Err(format!("Invalid API endpoint {:?}: {}", endpoint, e)),
    }
}

// =============================================================================
// Tests
// =============================================================================
