// Connection settings for the API client, resolved once at start-up.
// Flags and environment variables are bound by clap (see `cli.rs`); this
// module only fills in the token file fallback and the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "https://analysispreservation.cern.ch";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const TOKEN_FILE: &str = ".cap_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: String,
    pub token: Option<String>,
    pub insecure: bool,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server: DEFAULT_SERVER.to_string(),
            token: None,
            insecure: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Build settings from already-parsed options. A missing token falls
    /// back to `~/.cap_token`.
    pub fn resolve(server: String, token: Option<String>, insecure: bool, timeout_secs: u64) -> Self {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| token_file().and_then(|p| read_token(&p)));
        Settings {
            server: server.trim_end_matches('/').to_string(),
            token,
            insecure,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

fn token_file() -> Option<PathBuf> {
    dirs::home_dir().map(|dir| dir.join(TOKEN_FILE))
}

/// Trimmed first line of the token file, unless it is blank.
fn read_token(path: &Path) -> Option<String> {
    let data = std::fs::read_to_string(path).ok()?;
    let token = data.lines().next()?.trim();
    if token.is_empty() {
        None
    } else {
        tracing::debug!(path = %path.display(), "using token file");
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_token_wins_and_server_is_normalized() {
        let s = Settings::resolve("https://cap.example.org/".into(), Some("abc".into()), true, 5);
        assert_eq!(s.server, "https://cap.example.org");
        assert_eq!(s.token.as_deref(), Some("abc"));
        assert!(s.insecure);
        assert_eq!(s.timeout, Duration::from_secs(5));
    }

    #[test]
    fn token_file_uses_first_line() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "  secret-token  ").unwrap();
        writeln!(f, "ignored").unwrap();
        assert_eq!(read_token(f.path()).as_deref(), Some("secret-token"));
    }

    #[test]
    fn empty_token_file_is_ignored() {
        let f = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(read_token(f.path()), None);
    }
}
