// Upload flow: local pre-flight checks and the confirmation step that run
// before the single upload call.

use crate::error::{CommandError, Result};
use crate::ui::Confirm;
use std::io;
use std::path::{Path, PathBuf};

pub const CANCELLED: &str = "Upload cancelled.";

/// A checked upload: the source exists and the remote name is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub pid: String,
    pub source: PathBuf,
    pub filename: String,
}

impl UploadPlan {
    /// Check `file` is a readable regular file and work out the remote
    /// filename: `output_file` when given, otherwise the local basename.
    pub fn prepare(pid: String, file: &Path, output_file: Option<&str>) -> Result<Self> {
        let meta = std::fs::metadata(file).map_err(|source| CommandError::LocalIo {
            path: file.to_path_buf(),
            source,
        })?;
        if !meta.is_file() {
            return Err(CommandError::LocalIo {
                path: file.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let filename = match output_file {
            Some(name) => checked_name(name)?,
            None => file
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    CommandError::Validation(format!(
                        "cannot derive a filename from {}; pass --output-file",
                        file.display()
                    ))
                })?,
        };

        Ok(UploadPlan {
            pid,
            source: file.to_path_buf(),
            filename,
        })
    }

    pub fn prompt(&self) -> String {
        format!(
            "Upload {} to analysis {} as '{}'?",
            self.source.display(),
            self.pid,
            self.filename
        )
    }
}

fn checked_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(CommandError::Validation(format!(
            "invalid --output-file '{}'",
            name
        )));
    }
    Ok(name.to_string())
}

/// Whether to go ahead with `plan`. `yes` skips the prompt entirely.
pub fn confirm(plan: &UploadPlan, yes: bool, prompt: &dyn Confirm) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    let answer = prompt.confirm(&plan.prompt()).map_err(CommandError::Prompt)?;
    if !answer {
        tracing::info!(pid = %plan.pid, "upload declined");
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockCapApi;
    use crate::cli::Commands;
    use crate::commands::{execute, Outcome};
    use crate::error::ErrorKind;
    use crate::render::Payload;
    use crate::ui::FixedAnswer;
    use serde_json::json;
    use std::cell::RefCell;

    /// Records every prompt it is shown.
    struct Recorder {
        answer: bool,
        seen: RefCell<Vec<String>>,
    }

    impl Confirm for Recorder {
        fn confirm(&self, message: &str) -> io::Result<bool> {
            self.seen.borrow_mut().push(message.to_string());
            Ok(self.answer)
        }
    }

    struct Broken;

    impl Confirm for Broken {
        fn confirm(&self, _message: &str) -> io::Result<bool> {
            Err(io::Error::new(io::ErrorKind::Other, "not a terminal"))
        }
    }

    fn upload_cmd(file: &Path, output: Option<&str>, yes: bool) -> Commands {
        Commands::Upload {
            pid: "abc".into(),
            file: file.to_path_buf(),
            output_file: output.map(String::from),
            yes,
        }
    }

    #[test]
    fn basename_is_default_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.root");
        std::fs::write(&path, b"data").unwrap();
        let plan = UploadPlan::prepare("abc".into(), &path, None).unwrap();
        assert_eq!(plan.filename, "results.root");
        let plan = UploadPlan::prepare("abc".into(), &path, Some("renamed.root")).unwrap();
        assert_eq!(plan.filename, "renamed.root");
    }

    #[test]
    fn bad_output_names_are_rejected() {
        let f = tempfile::NamedTempFile::new().unwrap();
        for bad in ["", "a/b", ".."] {
            let err = UploadPlan::prepare("abc".into(), f.path(), Some(bad)).unwrap_err();
            assert!(matches!(err, CommandError::Validation(_)), "{:?}", bad);
        }
    }

    #[test]
    fn directory_is_not_uploadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = UploadPlan::prepare("abc".into(), dir.path(), None).unwrap_err();
        assert!(matches!(err, CommandError::LocalIo { .. }));
    }

    #[test]
    fn missing_file_is_local_io_with_no_upload_call() {
        let api = MockCapApi::new();
        let cmd = upload_cmd(Path::new("/no/such/file.txt"), None, true);
        match execute(&cmd, &api, &FixedAnswer(true)) {
            Outcome::Failure(f) => assert_eq!(f.kind, ErrorKind::LocalIOError),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn declining_cancels_with_zero_exit_and_no_upload() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let api = MockCapApi::new();
        let recorder = Recorder { answer: false, seen: RefCell::new(Vec::new()) };
        let outcome = execute(&upload_cmd(f.path(), Some("out.txt"), false), &api, &recorder);
        assert_eq!(outcome, Outcome::Cancelled(CANCELLED.to_string()));
        assert_eq!(outcome.exit_code(), 0);

        let seen = recorder.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains(&f.path().display().to_string()));
        assert!(seen[0].contains("abc"));
        assert!(seen[0].contains("out.txt"));
    }

    #[test]
    fn accepting_uploads_once_with_resolved_name() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let source = f.path().to_path_buf();
        let mut api = MockCapApi::new();
        api.expect_upload()
            .withf(move |pid, path, name| pid == "abc" && path == source.as_path() && name == "out.txt")
            .times(1)
            .returning(|_, _, _| Ok(json!({"key": "out.txt"})));
        let outcome = execute(&upload_cmd(f.path(), Some("out.txt"), false), &api, &FixedAnswer(true));
        assert_eq!(outcome, Outcome::Success(Payload::Json(json!({"key": "out.txt"}))));
    }

    #[test]
    fn yes_skips_the_prompt() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let mut api = MockCapApi::new();
        api.expect_upload().times(1).returning(|_, _, _| Ok(json!({})));
        let recorder = Recorder { answer: false, seen: RefCell::new(Vec::new()) };
        let outcome = execute(&upload_cmd(f.path(), None, true), &api, &recorder);
        assert_eq!(outcome.exit_code(), 0);
        assert!(recorder.seen.borrow().is_empty());
    }

    #[test]
    fn unreadable_prompt_is_local_io() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let api = MockCapApi::new();
        match execute(&upload_cmd(f.path(), None, false), &api, &Broken) {
            Outcome::Failure(f) => assert_eq!(f.kind, ErrorKind::LocalIOError),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
