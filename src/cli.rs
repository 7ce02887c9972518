// Command-line surface: clap definitions, plus the mapping of clap's own
// usage errors into a validation failure.

use crate::config::{DEFAULT_SERVER, DEFAULT_TIMEOUT_SECS};
use crate::error::CommandError;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI for CERN Analysis Preservation: manage analyses from the terminal.
#[derive(Parser, Debug)]
#[command(name = "cap-client", version, about = "CERN Analysis Preservation command-line client")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Server base URL
    #[arg(long, short = 's', env = "CAP_SERVER", default_value = DEFAULT_SERVER, global = true)]
    pub server: String,

    /// Access token (falls back to ~/.cap_token)
    #[arg(long, env = "CAP_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "CAP_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout: u64,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    pub loglevel: LogLevel,

    /// Shorthand for --loglevel debug
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl GlobalOpts {
    pub fn log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            self.loglevel
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Health check CAP server
    Ping,

    /// Retrieve user info
    #[command(visible_alias = "whoami")]
    Me,

    /// Retrieve one or all analyses
    Get {
        /// Get analysis with given pid
        #[arg(long, short = 'p')]
        pid: Option<String>,

        /// Retrieve all analyses you can access
        #[arg(long)]
        all: bool,
    },

    /// Create an analysis
    Create {
        /// File with JSON data
        #[arg(long = "json-file", short = 'f')]
        json_file: PathBuf,

        /// Type of analysis
        #[arg(long = "type", short = 't')]
        ana_type: Option<String>,

        /// JSON schema version of the analysis type
        #[arg(long)]
        version: Option<String>,
    },

    /// Delete analysis with given pid
    Delete {
        #[arg(long, short = 'p')]
        pid: String,
    },

    /// Update analysis with given pid
    Update {
        #[arg(long, short = 'p')]
        pid: String,

        /// File with JSON data
        #[arg(long = "json-file", short = 'f')]
        json_file: PathBuf,
    },

    /// Patch analysis with given pid
    Patch {
        #[arg(long, short = 'p')]
        pid: String,

        /// File with a JSON Patch document
        #[arg(long = "json-file", short = 'f')]
        json_file: PathBuf,
    },

    /// Upload a file to analysis with given pid
    Upload {
        #[arg(long, short = 'p')]
        pid: String,

        /// File to upload
        file: PathBuf,

        /// Filename to be given to the uploaded file
        #[arg(long = "output-file", short = 'o')]
        output_file: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Retrieve all types of analyses
    #[command(visible_alias = "list-types")]
    Types,
}

/// Condense a clap usage error to one line: the message up to the usage
/// block, without clap's `error:` prefix.
pub fn usage_error(err: &clap::Error) -> CommandError {
    let text = err.to_string();
    let message = text.split("\n\n").next().unwrap_or_default();
    let message = message.trim().trim_start_matches("error:");
    CommandError::Validation(message.split_whitespace().collect::<Vec<_>>().join(" "))
}
