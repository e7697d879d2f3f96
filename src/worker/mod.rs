mod policy;


pub use policy::FaultPolicy;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cancel::Cancellation;
use crate::content::ContentId;
use crate::lexeme::summarize;
use crate::profile::{ProfileError, profile};
use crate::queue::{ErrorChannel, QueueError, WorkQueue};
use crate::store::{AggregateStore, CorpusStore, StoreError};
use crate::tokenizer::{SourceInput, TokenizeError, Tokenizer};

/// Longest uninterrupted sleep while backing off
const BACKOFF_SLICE: Duration = Duration::from_millis(50);

/// Errors that stop a worker
#[derive(Error, Debug)]
pub enum WorkerError {
    /// An interrupted item could be neither finished nor handed off
    #[error("Lost {id}: could not publish to the error channel: {source}")]
    Lost { id: ContentId, source: QueueError },

    #[error("Stopping after {0} consecutive faults")]
    TooManyFaults(u32),
}

/// How processing one item ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Results persisted and acknowledged
    Analyzed,
    /// Failure recorded and acknowledged
    SyntaxError,
    /// Unexpected fault; the item went to the error channel
    Faulted,
    /// Cancelled mid-flight; the item went to the error channel unacknowledged
    Interrupted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub analyzed: u64,
    pub syntax_errors: u64,
    pub faults: u64,
}

#[derive(Error, Debug)]
enum Fault {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Where an item stands once the pipeline has run
enum Analysis {
    Analyzed,
    SyntaxError,
    Interrupted,
}

/// Pops content ids, tokenizes their sources, and records the results.
///
/// Each worker owns its queue and store handles; run one per thread.
pub struct MiningWorker {
    queue: Box<dyn WorkQueue>,
    errors: Box<dyn ErrorChannel>,
    corpus: Box<dyn CorpusStore>,
    aggregate: Box<dyn AggregateStore>,
    tokenizer: Arc<dyn Tokenizer>,
    cancel: Cancellation,
    policy: FaultPolicy,
}

impl MiningWorker {
    pub fn new(
        queue: impl WorkQueue + 'static,
        errors: impl ErrorChannel + 'static,
        corpus: impl CorpusStore + 'static,
        aggregate: impl AggregateStore + 'static,
        tokenizer: Arc<dyn Tokenizer>,
        cancel: Cancellation,
    ) -> Self {
        Self {
            queue: Box::new(queue),
            errors: Box::new(errors),
            corpus: Box::new(corpus),
            aggregate: Box::new(aggregate),
            tokenizer,
            cancel,
            policy: FaultPolicy::default(),
        }
    }

    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Process items until cancelled.
    ///
    /// Faults on individual items are logged and counted. Only a lost item
    /// or an exhausted fault budget ends the loop with an error.
    pub fn run(&self) -> Result<WorkerStats, WorkerError> {
        let mut stats = WorkerStats::default();
        let mut streak = 0;

        info!("Worker listening for work");
        loop {
            let id = match self.queue.pop(&self.cancel) {
                Ok(id) => id,
                Err(QueueError::Interrupted) => break,
                Err(err) => {
                    error!(error = %err, "Failed to pop from queue");
                    stats.faults += 1;
                    streak += 1;
                    self.back_off(streak)?;
                    continue;
                }
            };
            debug!(%id, "Pulled");

            match self.process(&id)? {
                Outcome::Analyzed => {
                    stats.analyzed += 1;
                    streak = 0;
                }
                Outcome::SyntaxError => {
                    stats.syntax_errors += 1;
                    streak = 0;
                }
                Outcome::Faulted => {
                    stats.faults += 1;
                    streak += 1;
                    self.back_off(streak)?;
                }
                Outcome::Interrupted => break,
            }
        }

        info!(
            analyzed = stats.analyzed,
            syntax_errors = stats.syntax_errors,
            faults = stats.faults,
            "Worker stopped"
        );
        Ok(stats)
    }

    /// Handle one item already popped from this worker's queue.
    ///
    /// The item leaves this call either acknowledged or in the error channel.
    /// The one exception is a fault whose error-channel publish also fails:
    /// the item then stays in flight for the transport to redeliver.
    pub fn process(&self, id: &ContentId) -> Result<Outcome, WorkerError> {
        let outcome = match self.analyze(id) {
            Ok(Analysis::Analyzed) => Outcome::Analyzed,
            Ok(Analysis::SyntaxError) => Outcome::SyntaxError,
            Ok(Analysis::Interrupted) => {
                warn!(%id, "Interrupted; handing off to the error channel");
                self.errors
                    .publish(id)
                    .map_err(|source| WorkerError::Lost {
                        id: id.clone(),
                        source,
                    })?;
                return Ok(Outcome::Interrupted);
            }
            Err(fault) => {
                error!(%id, error = %fault, "Failed");
                if let Err(err) = self.errors.publish(id) {
                    error!(%id, error = %err, "Failed to publish; leaving in flight");
                    return Ok(Outcome::Faulted);
                }
                Outcome::Faulted
            }
        };

        if let Err(err) = self.queue.acknowledge(id) {
            error!(%id, error = %err, "Failed to acknowledge");
            return Ok(Outcome::Faulted);
        }
        Ok(outcome)
    }

    /// Fetch, tokenize and persist. Nothing is written once cancellation has
    /// been observed.
    fn analyze(&self, id: &ContentId) -> Result<Analysis, Fault> {
        let source = self.corpus.get_source(id)?;
        if self.cancel.is_cancelled() {
            return Ok(Analysis::Interrupted);
        }

        let parsed = match self.tokenizer.tokenize(SourceInput::Bytes(&source)) {
            Ok(parsed) => parsed,
            Err(TokenizeError::Syntax { status, stderr }) => {
                if self.cancel.is_cancelled() {
                    return Ok(Analysis::Interrupted);
                }
                info!(%id, status, stderr = stderr.trim(), "Syntax error in");
                self.corpus.record_parse_failure(id)?;
                return Ok(Analysis::SyntaxError);
            }
            Err(err) => return Err(err.into()),
        };
        if self.cancel.is_cancelled() {
            return Ok(Analysis::Interrupted);
        }

        let summary = summarize(&parsed.tokens);
        let counts = profile(&parsed.tokens)?;

        self.corpus
            .record_parse_success(id, &parsed.tokens, &parsed.ast)?;
        self.corpus.record_source_summary(id, summary)?;
        if !self.aggregate.record_profile(id, &counts)? {
            debug!(%id, "Codepoints already counted");
        }

        info!(
            %id,
            sloc = summary.sloc,
            n_tokens = summary.n_tokens,
            codepoints = counts.total(),
            "Analyzed"
        );
        Ok(Analysis::Analyzed)
    }

    /// Sleep before the next item, or give up if the streak is too long
    fn back_off(&self, streak: u32) -> Result<(), WorkerError> {
        if self.policy.exhausted(streak) {
            return Err(WorkerError::TooManyFaults(streak));
        }

        let deadline = Instant::now() + self.policy.delay(streak);
        while !self.cancel.is_cancelled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(remaining.min(BACKOFF_SLICE));
        }
        Ok(())
    }
}
