// Library root
// ------------
// The binary (`main.rs`) only wires these modules together:
// - `cli`: clap definitions of the subcommands and global options.
// - `config`: server/token/timeout settings.
// - `api`: the `CapApi` contract and its reqwest implementation.
// - `commands`: validation, the single API call, and the `Outcome`.
// - `upload`: pre-flight checks and confirmation for file uploads.
// - `render`: prints an `Outcome` to stdout or stderr.
// - `error`: error types and their classification.
// - `ui`: terminal prompt and spinner.
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod render;
pub mod ui;
pub mod upload;
