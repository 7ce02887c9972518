// Error taxonomy shared by every command.
//
// `ApiError` is what the API client raises, `CommandError` is any failure a
// command pipeline can end with, and `classify` folds both into the fixed
// `ErrorKind` set the renderer and the exit status branch on.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by an implementation of [`crate::api::CapApi`].
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("cannot read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Any failure a single command invocation can end with.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{0}")]
    Validation(String),

    #[error("{}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not read confirmation: {0}")]
    Prompt(#[source] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NetworkError,
    AuthError,
    NotFound,
    ValidationError,
    ServerError,
    LocalIOError,
    Unknown,
}

impl ErrorKind {
    /// Fixed one-liner shown to the user for this kind.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "Could not reach the server.",
            ErrorKind::AuthError => "Not authorized. Check your access token.",
            ErrorKind::NotFound => "Resource not found.",
            ErrorKind::ValidationError => "Invalid input.",
            ErrorKind::ServerError => "The server failed to handle the request.",
            ErrorKind::LocalIOError => "Local file error.",
            ErrorKind::Unknown => "Unexpected error.",
        }
    }

    /// Process exit status. 2 matches clap's own usage errors.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Unknown => 1,
            ErrorKind::ValidationError => 2,
            ErrorKind::NetworkError => 3,
            ErrorKind::AuthError => 4,
            ErrorKind::NotFound => 5,
            ErrorKind::ServerError => 6,
            ErrorKind::LocalIOError => 7,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "network",
            ErrorKind::AuthError => "auth",
            ErrorKind::NotFound => "not-found",
            ErrorKind::ValidationError => "validation",
            ErrorKind::ServerError => "server",
            ErrorKind::LocalIOError => "local-io",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn classify_status(status: u16) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::AuthError,
        404 | 410 => ErrorKind::NotFound,
        400 | 422 => ErrorKind::ValidationError,
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::Unknown,
    }
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport(e) => {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    ErrorKind::NetworkError
                } else if let Some(status) = e.status() {
                    classify_status(status.as_u16())
                } else {
                    ErrorKind::Unknown
                }
            }
            ApiError::Status { status, .. } => classify_status(*status),
            ApiError::Response(_) => ErrorKind::Unknown,
            ApiError::Invalid(_) => ErrorKind::ValidationError,
            ApiError::File { .. } => ErrorKind::LocalIOError,
        }
    }
}

/// Map any command failure to its kind. Pure; callers log and print.
pub fn classify(err: &CommandError) -> ErrorKind {
    match err {
        CommandError::Validation(_) | CommandError::MalformedJson { .. } => {
            ErrorKind::ValidationError
        }
        CommandError::LocalIo { .. } | CommandError::Prompt(_) => ErrorKind::LocalIOError,
        CommandError::Api(api) => api.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn status(code: u16) -> CommandError {
        CommandError::Api(ApiError::Status {
            status: code,
            body: String::new(),
        })
    }

    #[test]
    fn http_statuses_map_to_kinds() {
        assert_eq!(classify(&status(401)), ErrorKind::AuthError);
        assert_eq!(classify(&status(403)), ErrorKind::AuthError);
        assert_eq!(classify(&status(404)), ErrorKind::NotFound);
        assert_eq!(classify(&status(422)), ErrorKind::ValidationError);
        assert_eq!(classify(&status(500)), ErrorKind::ServerError);
        assert_eq!(classify(&status(503)), ErrorKind::ServerError);
        assert_eq!(classify(&status(418)), ErrorKind::Unknown);
    }

    #[test]
    fn local_failures_are_classified_without_network() {
        let missing = CommandError::LocalIo {
            path: "nope.json".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(classify(&missing), ErrorKind::LocalIOError);

        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let malformed = CommandError::MalformedJson {
            path: "bad.json".into(),
            source: bad_json,
        };
        assert_eq!(classify(&malformed), ErrorKind::ValidationError);

        let flag = CommandError::Validation("missing --pid".into());
        assert_eq!(classify(&flag), ErrorKind::ValidationError);
    }

    #[test]
    fn unexpected_response_is_unknown() {
        let err = CommandError::Api(ApiError::Response("no bucket link".into()));
        assert_eq!(classify(&err), ErrorKind::Unknown);
    }

    #[test]
    fn exit_codes_are_distinct_and_non_zero() {
        let kinds = [
            ErrorKind::NetworkError,
            ErrorKind::AuthError,
            ErrorKind::NotFound,
            ErrorKind::ValidationError,
            ErrorKind::ServerError,
            ErrorKind::LocalIOError,
            ErrorKind::Unknown,
        ];
        let mut codes: Vec<i32> = kinds.iter().map(|k| k.exit_code()).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }
}
