//! Shared test utilities for the binder crate.

use crate::error::{BindError, Result};
use crate::executor::{CommandExecutor, Invocation};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program expected to run (e.g., "python3").
    pub program: String,
    /// The exact arguments expected, or `None` to accept any.
    pub args: Option<Vec<String>>,
    /// JSON written to the file named by the final argument before returning.
    ///
    /// Stands in for the metadata capture the harvest interpreter produces.
    pub capture: Option<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Expects `program` with any arguments and returns `output`.
    pub fn new(program: &str, output: Output) -> Self {
        Self {
            program: program.to_owned(),
            args: None,
            capture: None,
            result: Ok(output),
        }
    }

    /// Expects `program` and fails to spawn it.
    pub fn spawn_failure(program: &str) -> Self {
        Self {
            program: program.to_owned(),
            args: None,
            capture: None,
            result: Err(BindError::CommandSpawn {
                program: program.to_owned(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
        }
    }

    /// Requires the invocation to carry exactly `args`.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Writes `json` to the capture file named by the last argument.
    #[must_use]
    pub fn writing_capture(mut self, json: &str) -> Self {
        self.capture = Some(json.to_owned());
        self
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records every invocation and returns predefined results, allowing tests
/// to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    invocations: RefCell<Vec<Invocation>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            invocations: RefCell::new(Vec::new()),
        }
    }

    /// Invocations received so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        self.invocations.borrow_mut().push(invocation.clone());
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| BindError::StubMismatch {
                message: format!("unexpected invocation: {}", invocation.command_line()),
            })?;

        if call.program != invocation.program {
            return Err(BindError::StubMismatch {
                message: format!("expected {}, got {}", call.program, invocation.program),
            });
        }
        if let Some(args) = &call.args {
            if args != &invocation.args {
                return Err(BindError::StubMismatch {
                    message: format!("expected args {args:?}, got {:?}", invocation.args),
                });
            }
        }
        if let Some(json) = &call.capture {
            let path = invocation.args.last().ok_or_else(|| BindError::StubMismatch {
                message: "capture requested but invocation has no arguments".to_owned(),
            })?;
            std::fs::write(path, json).map_err(|e| BindError::io(path.as_str(), e))?;
        }
        call.result
    }
}

/// Builds a gzip-compressed tarball holding `files` as `(path, contents)`.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
pub fn sdist_tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .expect("append tar entry");
    }
    let encoder = builder.into_inner().expect("finish tar");
    encoder.finish().expect("finish gzip")
}

/// Builds a zip archive holding `files` as `(path, contents)`.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
pub fn sdist_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (path, contents) in files {
        writer.start_file(*path, options).expect("start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}
