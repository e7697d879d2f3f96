use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Output, Stdio};
use tracing::debug;

use super::source_file::SourceFile;
use super::{Parsed, SourceInput, TokenizeError, Tokenizer};

/// How the source file reaches the parser process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// Connected to the child's stdin
    #[default]
    Stdin,
    /// Passed as the last command-line argument
    PathArgument,
}

pub const DEFAULT_CHECK_SYNTAX_FLAG: &str = "--check-syntax";

/// Tokenizer backed by an external parser program.
///
/// On success the program prints `{"tokens": [...], "ast": {...}}` and exits
/// zero. Any non-zero exit means the source did not parse.
#[derive(Debug, Clone)]
pub struct ExternalTokenizer {
    program: PathBuf,
    args: Vec<String>,
    check_syntax_flag: String,
    input: InputMode,
}

impl ExternalTokenizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            check_syntax_flag: DEFAULT_CHECK_SYNTAX_FLAG.to_string(),
            input: InputMode::default(),
        }
    }

    /// Append a fixed argument passed on every invocation
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input_mode(mut self, mode: InputMode) -> Self {
        self.input = mode;
        self
    }

    pub fn check_syntax_flag(mut self, flag: impl Into<String>) -> Self {
        self.check_syntax_flag = flag.into();
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Write the source to a private file and run the parser over it
    fn run(&self, source: SourceInput<'_>, extra: Option<&str>) -> Result<Output, TokenizeError> {
        let file = SourceFile::create(source)?;

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(flag) = extra {
            command.arg(flag);
        }

        match self.input {
            InputMode::Stdin => {
                command.stdin(file.stdin()?);
            }
            InputMode::PathArgument => {
                command.arg(file.path()).stdin(Stdio::null());
            }
        }

        debug!(program = %self.program.display(), "running parser");
        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        // `file` drops here, removing the temporary copy
        Ok(output)
    }
}

impl Tokenizer for ExternalTokenizer {
    fn tokenize(&self, source: SourceInput<'_>) -> Result<Parsed, TokenizeError> {
        let output = self.run(source, None)?;

        if let Some(err) = failure(&output) {
            return Err(err);
        }

        decode_output(&output.stdout)
    }

    fn check_syntax(&self, source: SourceInput<'_>) -> Result<bool, TokenizeError> {
        let output = self.run(source, Some(&self.check_syntax_flag))?;
        match failure(&output) {
            None => Ok(true),
            Some(err) if err.is_syntax() => Ok(false),
            Some(err) => Err(err),
        }
    }
}

/// Only an exit code means the parser rejected the source; a process killed
/// by a signal says nothing about it
fn failure(output: &Output) -> Option<TokenizeError> {
    if output.status.success() {
        return None;
    }

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    Some(match output.status.code() {
        Some(status) => {
            debug!(status, %stderr, "parser rejected source");
            TokenizeError::Syntax { status, stderr }
        }
        None => {
            let signal = signal(&output.status);
            debug!(?signal, %stderr, "parser killed");
            TokenizeError::Killed { signal, stderr }
        }
    })
}

#[cfg(unix)]
fn signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Decode the parser's JSON payload
pub fn decode_output(stdout: &[u8]) -> Result<Parsed, TokenizeError> {
    let text = std::str::from_utf8(stdout)
        .map_err(|e| TokenizeError::Protocol(format!("Output is not UTF-8: {}", e)))?;

    serde_json::from_str(text).map_err(|e| TokenizeError::Protocol(e.to_string()))
}
