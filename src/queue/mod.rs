mod memory;
mod sqlite;

#[cfg(test)]
mod tests;

pub use memory::MemoryQueue;
pub use sqlite::{QueueDepth, SqliteQueue};

use crate::cancel::Cancellation;
use crate::content::ContentId;
use std::time::Duration;
use thiserror::Error;

/// How often a blocked pop re-checks for work and cancellation
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Suffix appended to a queue name to form its error channel
pub const ERROR_CHANNEL_SUFFIX: &str = ":errors";

pub fn error_channel_name(queue: &str) -> String {
    format!("{}{}", queue, ERROR_CHANNEL_SUFFIX)
}

#[derive(Error, Debug)]
pub enum QueueError {
    /// Cancelled while waiting; nothing was dequeued
    #[error("Interrupted while waiting for work")]
    Interrupted,

    #[error("{0} is not in flight")]
    NotInFlight(ContentId),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

/// Reliable work queue.
///
/// A popped item stays in flight, owned by the caller, until it is
/// acknowledged. Unacknowledged items may be redelivered after a crash.
pub trait WorkQueue: Send {
    fn push(&self, item: &ContentId) -> Result<(), QueueError>;

    /// Block until an item is available or `cancel` fires
    fn pop(&self, cancel: &Cancellation) -> Result<ContentId, QueueError>;

    /// Finish an in-flight item. Fails with `NotInFlight` if this handle does
    /// not currently hold it.
    fn acknowledge(&self, item: &ContentId) -> Result<(), QueueError>;

    /// Whether `item` is pending or in flight on this queue
    fn contains(&self, item: &ContentId) -> Result<bool, QueueError>;
}

/// Secondary queue of items that hit an unexpected fault
pub trait ErrorChannel: Send {
    fn publish(&self, item: &ContentId) -> Result<(), QueueError>;
}
