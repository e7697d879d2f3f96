// Public API exports
pub mod cancel;
pub mod config;
pub mod content;
pub mod db;
pub mod ingest;
pub mod lexeme;
pub mod profile;
pub mod queue;
pub mod store;
pub mod tokenizer;
pub mod worker;

// Re-export main types for convenience
pub use cancel::Cancellation;
pub use config::{MinerConfig, ParserConfig};
pub use content::ContentId;

pub use lexeme::{
    CanonicalizeError, Location, Position, SourceSummary, Token, TokenKind, canonicalize,
    summarize, vocabularize,
};
pub use profile::{CodepointCounts, ProfileError, profile, uplus_label};

pub use tokenizer::{ExternalTokenizer, InputMode, Parsed, SourceInput, TokenizeError, Tokenizer};

pub use queue::{ErrorChannel, MemoryQueue, QueueError, SqliteQueue, WorkQueue};
pub use store::{
    AggregateStore, CorpusStore, MemoryAggregate, MemoryCorpus, SqliteAggregate, SqliteCorpus,
    StoreError,
};

pub use ingest::{IngestReport, ingest_directory};
pub use worker::{FaultPolicy, MiningWorker, Outcome, WorkerError, WorkerStats};
