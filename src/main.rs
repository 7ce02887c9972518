// Entrypoint: set up logging and settings, build the API client once, run
// the selected command and exit with its status.

use anyhow::Context;
use cap_client::api::ApiClient;
use cap_client::cli::{usage_error, Cli, LogLevel};
use cap_client::commands::{execute, fail};
use cap_client::config::Settings;
use cap_client::render::Renderer;
use cap_client::ui::TerminalConfirm;
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cap_client={}", level.as_str())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help, --version, and a bare `cap-client` showing help
        Err(err)
            if !err.use_stderr()
                || err.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand =>
        {
            err.exit()
        }
        Err(err) => {
            let outcome = fail(usage_error(&err));
            Renderer::stdio()
                .render(&outcome)
                .context("Failed to write output")?;
            std::process::exit(outcome.exit_code());
        }
    };
    init_logging(cli.global.log_level());

    let g = &cli.global;
    let settings = Settings::resolve(g.server.clone(), g.token.clone(), g.insecure, g.timeout);
    let api = ApiClient::from_settings(&settings)?;
    tracing::debug!(server = %settings.server, token = api.has_token(), "client ready");

    let outcome = execute(&cli.command, &api, &TerminalConfirm);
    Renderer::stdio()
        .render(&outcome)
        .context("Failed to write output")?;
    std::process::exit(outcome.exit_code());
}
