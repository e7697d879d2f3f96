use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::queue::error_channel_name;
use crate::tokenizer::{DEFAULT_CHECK_SYNTAX_FLAG, ExternalTokenizer, InputMode};
use crate::worker::FaultPolicy;

/// Settings shared by every subcommand.
///
/// Loaded from a JSON file when one is given; any field left out keeps its
/// default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    pub database: PathBuf,
    /// Primary queue name; the error channel is derived from it
    pub queue: String,
    pub parser: ParserConfig,
    pub poll_interval_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub max_consecutive_faults: Option<u32>,
    pub workers: usize,
}

/// How to launch the external tokenizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub check_syntax_flag: String,
    pub input: InputMode,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("corpus.sqlite3"),
            queue: "sources".to_string(),
            parser: ParserConfig::default(),
            poll_interval_ms: 200,
            backoff_base_ms: 100,
            backoff_cap_ms: 30_000,
            max_consecutive_faults: None,
            workers: 1,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("esprima-tokenize"),
            args: Vec::new(),
            check_syntax_flag: DEFAULT_CHECK_SYNTAX_FLAG.to_string(),
            input: InputMode::default(),
        }
    }
}

impl MinerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .context(format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&text).context(format!("Invalid config: {}", path.display()))
    }

    /// Load `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn error_queue(&self) -> String {
        error_channel_name(&self.queue)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fault_policy(&self) -> FaultPolicy {
        FaultPolicy {
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_cap: Duration::from_millis(self.backoff_cap_ms),
            max_consecutive_faults: self.max_consecutive_faults,
        }
    }

    pub fn tokenizer(&self) -> ExternalTokenizer {
        ExternalTokenizer::new(&self.parser.program)
            .args(self.parser.args.iter())
            .check_syntax_flag(&self.parser.check_syntax_flag)
            .input_mode(self.parser.input)
    }
}
