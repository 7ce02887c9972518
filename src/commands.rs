// Command pipeline shared by every subcommand:
//
//   parse (clap) -> build_request -> invoke (one API call) -> Outcome
//
// Local validation happens entirely in `build_request`, so a bad flag or a
// missing file never reaches the API client. `execute` is the only place a
// failure is classified; the renderer just prints the `Outcome`.

use crate::api::CapApi;
use crate::cli::Commands;
use crate::error::{classify, ApiError, CommandError, ErrorKind, Result};
use crate::render::{Payload, TYPES_HEADER};
use crate::ui::{self, Confirm};
use crate::upload::{self, UploadPlan};
use serde_json::Value;
use std::path::Path;

/// The single result of one command invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Payload),
    /// The user declined; not an error.
    Cancelled(String),
    Failure(Failure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success(_) | Outcome::Cancelled(_) => 0,
            Outcome::Failure(f) => f.kind.exit_code(),
        }
    }
}

impl From<CommandError> for Failure {
    fn from(err: CommandError) -> Self {
        Failure {
            kind: classify(&err),
            detail: err.to_string(),
        }
    }
}

/// A fully validated call, ready to hand to the API client.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Ping,
    Me,
    Get { pid: Option<String>, all: bool },
    Create { data: Value, ana_type: Option<String>, version: Option<String> },
    Delete { pid: String },
    Update { pid: String, data: Value },
    Patch { pid: String, data: Value },
    Upload(UploadPlan),
    Types,
}

impl Request {
    pub fn operation(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::Me => "me",
            Request::Get { .. } => "get",
            Request::Create { .. } => "create",
            Request::Delete { .. } => "delete",
            Request::Update { .. } => "update",
            Request::Patch { .. } => "patch",
            Request::Upload(_) => "upload",
            Request::Types => "types",
        }
    }

    /// Perform the one API call this request stands for.
    pub fn invoke(self, api: &dyn CapApi) -> std::result::Result<Payload, ApiError> {
        match self {
            Request::Ping => api.ping().map(Payload::Json),
            Request::Me => api.me().map(Payload::Json),
            Request::Get { pid, all } => api.get(pid, all).map(Payload::Json),
            Request::Create { data, ana_type, version } => {
                api.create(&data, ana_type, version).map(Payload::Json)
            }
            Request::Delete { pid } => api.delete(&pid).map(Payload::from_value),
            Request::Update { pid, data } => api.update(&pid, &data).map(Payload::Json),
            Request::Patch { pid, data } => api.patch(&pid, &data).map(Payload::Json),
            Request::Upload(plan) => api
                .upload(&plan.pid, &plan.source, &plan.filename)
                .map(Payload::Json),
            Request::Types => api.types().map(|items| Payload::Lines {
                header: TYPES_HEADER.to_string(),
                items,
            }),
        }
    }
}

/// The pid is opaque: only a blank one is refused, anything else is passed on
/// exactly as given.
fn require_pid(pid: &str) -> Result<String> {
    if pid.trim().is_empty() {
        return Err(CommandError::Validation("--pid must not be empty".into()));
    }
    Ok(pid.to_string())
}

/// Read and parse a `--json-file`. The file is closed before returning.
pub fn read_json_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|source| CommandError::LocalIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CommandError::MalformedJson {
        path: path.to_path_buf(),
        source,
    })
}

fn build_get(pid: &Option<String>, all: bool) -> Result<Request> {
    match (pid, all) {
        (Some(_), true) => Err(CommandError::Validation(
            "use either --pid or --all, not both".into(),
        )),
        (None, false) => Err(CommandError::Validation(
            "either --pid or --all is required".into(),
        )),
        (None, true) => Ok(Request::Get { pid: None, all: true }),
        (Some(pid), false) => Ok(Request::Get {
            pid: Some(require_pid(pid)?),
            all: false,
        }),
    }
}

fn build_patch(pid: &str, json_file: &Path) -> Result<Request> {
    let pid = require_pid(pid)?;
    let data = read_json_file(json_file)?;
    if !data.is_array() {
        return Err(CommandError::Validation(format!(
            "{} must hold a JSON Patch array",
            json_file.display()
        )));
    }
    Ok(Request::Patch { pid, data })
}

/// Validate parsed flags and read any local input. No network access.
pub fn build_request(command: &Commands) -> Result<Request> {
    match command {
        Commands::Ping => Ok(Request::Ping),
        Commands::Me => Ok(Request::Me),
        Commands::Get { pid, all } => build_get(pid, *all),
        Commands::Create { json_file, ana_type, version } => Ok(Request::Create {
            data: read_json_file(json_file)?,
            ana_type: ana_type.clone(),
            version: version.clone(),
        }),
        Commands::Delete { pid } => Ok(Request::Delete { pid: require_pid(pid)? }),
        Commands::Update { pid, json_file } => Ok(Request::Update {
            pid: require_pid(pid)?,
            data: read_json_file(json_file)?,
        }),
        Commands::Patch { pid, json_file } => build_patch(pid, json_file),
        Commands::Upload { pid, file, output_file, .. } => {
            let pid = require_pid(pid)?;
            Ok(Request::Upload(UploadPlan::prepare(pid, file, output_file.as_deref())?))
        }
        Commands::Types => Ok(Request::Types),
    }
}

/// Run one command end to end and return its single outcome.
pub fn execute(command: &Commands, api: &dyn CapApi, confirm: &dyn Confirm) -> Outcome {
    let request = match build_request(command) {
        Ok(request) => request,
        Err(err) => return fail(err),
    };

    if let (Request::Upload(plan), Commands::Upload { yes, .. }) = (&request, command) {
        match upload::confirm(plan, *yes, confirm) {
            Ok(true) => {}
            Ok(false) => return Outcome::Cancelled(upload::CANCELLED.to_string()),
            Err(err) => return fail(err),
        }
    }

    let operation = request.operation();
    tracing::info!(operation, "invoking API");
    let result = ui::with_spinner(&format!("{}...", operation), || request.invoke(api));
    match result {
        Ok(payload) => Outcome::Success(payload),
        Err(err) => fail(err.into()),
    }
}

/// Turn a failure raised outside `execute` (e.g. argument parsing) into the
/// same outcome shape.
pub fn fail(err: CommandError) -> Outcome {
    let failure = Failure::from(err);
    tracing::debug!(kind = %failure.kind, detail = %failure.detail, "command failed");
    Outcome::Failure(failure)
}
