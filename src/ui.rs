// UI layer: the few terminal interactions a command needs. Prompts go
// through the `Confirm` trait so the upload flow can be driven by a fixed
// answer in tests; the spinner draws on stderr and hides itself when stderr
// is not a terminal.

use dialoguer::Confirm as ConfirmPrompt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::time::Duration;

/// Yes/no question asked before a side-effecting action.
pub trait Confirm {
    fn confirm(&self, message: &str) -> io::Result<bool>;
}

/// Interactive prompt on the terminal. Defaults to "no"; errors when
/// stderr is not a terminal instead of waiting on input that never comes.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, message: &str) -> io::Result<bool> {
        if !io::stderr().is_terminal() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no terminal to prompt on; pass --yes",
            ));
        }
        ConfirmPrompt::new()
            .with_prompt(message)
            .default(false)
            .interact()
    }
}

/// Always gives the same answer without touching the terminal.
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _message: &str) -> io::Result<bool> {
        Ok(self.0)
    }
}

/// Run `f` while a spinner with `message` ticks on stderr. The spinner is
/// cleared before returning so it never mixes with rendered output.
pub fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    spinner.finish_and_clear();
    out
}
