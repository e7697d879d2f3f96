use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::path::Path;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

use super::{DEFAULT_POLL_INTERVAL, ErrorChannel, QueueError, WorkQueue};
use crate::cancel::Cancellation;
use crate::content::ContentId;
use crate::db;

/// Named queue stored in the `queue_item` table.
///
/// Popping claims the oldest pending row for this handle's worker id in one
/// statement, so two handles never hold the same row.
pub struct SqliteQueue {
    conn: Connection,
    name: String,
    worker_id: String,
    poll_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueDepth {
    pub pending: u32,
    pub in_flight: u32,
}

impl SqliteQueue {
    pub fn open(path: &Path, name: impl Into<String>) -> Result<Self, QueueError> {
        Ok(Self::with_connection(db::open(path)?, name))
    }

    pub fn new_in_memory(name: impl Into<String>) -> Result<Self, QueueError> {
        Ok(Self::with_connection(db::open_in_memory()?, name))
    }

    fn with_connection(conn: Connection, name: impl Into<String>) -> Self {
        Self {
            conn,
            name: name.into(),
            worker_id: Uuid::new_v4().to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Claim the oldest pending item without waiting
    pub fn try_pop(&self) -> Result<Option<ContentId>, QueueError> {
        let item: Option<String> = self
            .conn
            .query_row(
                "UPDATE queue_item
                 SET state = 'processing', claimed_by = ?2, claimed_at = ?3
                 WHERE id = (
                     SELECT id FROM queue_item
                     WHERE queue = ?1 AND state = 'pending'
                     ORDER BY id LIMIT 1
                 )
                 RETURNING item",
                params![self.name, self.worker_id, Utc::now().to_rfc3339()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(item.map(ContentId::from))
    }

    /// Return every in-flight item of this queue to pending.
    ///
    /// Only safe when no worker is running, e.g. after a crash.
    pub fn requeue_in_flight(&self) -> Result<usize, QueueError> {
        let moved = self.conn.execute(
            "UPDATE queue_item SET state = 'pending', claimed_by = NULL, claimed_at = NULL
             WHERE queue = ?1 AND state = 'processing'",
            params![self.name],
        )?;
        Ok(moved)
    }

    /// Move every pending item onto `target`, oldest first
    pub fn drain_into(&self, target: &dyn WorkQueue) -> Result<usize, QueueError> {
        let mut moved = 0;
        while let Some(item) = self.try_pop()? {
            target.push(&item)?;
            self.acknowledge(&item)?;
            moved += 1;
        }
        Ok(moved)
    }

    pub fn depth(&self) -> Result<QueueDepth, QueueError> {
        let (pending, in_flight) = self.conn.query_row(
            "SELECT
                 COALESCE(SUM(state = 'pending'), 0),
                 COALESCE(SUM(state = 'processing'), 0)
             FROM queue_item WHERE queue = ?1",
            params![self.name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(QueueDepth { pending, in_flight })
    }
}

impl WorkQueue for SqliteQueue {
    fn push(&self, item: &ContentId) -> Result<(), QueueError> {
        self.conn.execute(
            "INSERT INTO queue_item (queue, item, enqueued_at) VALUES (?1, ?2, ?3)",
            params![self.name, item.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn pop(&self, cancel: &Cancellation) -> Result<ContentId, QueueError> {
        loop {
            if cancel.is_cancelled() {
                return Err(QueueError::Interrupted);
            }
            if let Some(item) = self.try_pop()? {
                return Ok(item);
            }
            thread::sleep(self.poll_interval);
        }
    }

    fn acknowledge(&self, item: &ContentId) -> Result<(), QueueError> {
        let deleted = self.conn.execute(
            "DELETE FROM queue_item WHERE id = (
                 SELECT id FROM queue_item
                 WHERE queue = ?1 AND item = ?2 AND state = 'processing' AND claimed_by = ?3
                 ORDER BY id LIMIT 1
             )",
            params![self.name, item.as_str(), self.worker_id],
        )?;
        if deleted == 0 {
            return Err(QueueError::NotInFlight(item.clone()));
        }
        Ok(())
    }

    fn contains(&self, item: &ContentId) -> Result<bool, QueueError> {
        let found = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM queue_item WHERE queue = ?1 AND item = ?2)",
            params![self.name, item.as_str()],
            |row| row.get(0),
        )?;
        Ok(found)
    }
}

impl ErrorChannel for SqliteQueue {
    fn publish(&self, item: &ContentId) -> Result<(), QueueError> {
        self.push(item)
    }
}
