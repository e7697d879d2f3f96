use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenizeError {
    /// The parser rejected the source. Expected for malformed files.
    #[error("Failed to parse file (exit code: {status})")]
    Syntax { status: i32, stderr: String },

    /// The parser died without an exit code, e.g. from a signal. Says
    /// nothing about the source.
    #[error("Parser was killed (signal: {signal:?})")]
    Killed { signal: Option<i32>, stderr: String },

    /// The parser claimed success but its output is unusable
    #[error("Unexpected parser output: {0}")]
    Protocol(String),

    #[error("Failed to run parser: {0}")]
    Io(#[from] std::io::Error),
}

impl TokenizeError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, TokenizeError::Syntax { .. })
    }
}
