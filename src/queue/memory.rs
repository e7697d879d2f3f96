use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use super::{DEFAULT_POLL_INTERVAL, ErrorChannel, QueueError, WorkQueue};
use crate::cancel::Cancellation;
use crate::content::ContentId;

/// Process-local queue. Clones share the same items, so one clone per worker
/// thread behaves like separate connections to one broker.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    inner: Arc<(Mutex<QueueState>, Condvar)>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<ContentId>,
    in_flight: HashMap<ContentId, usize>,
    acknowledged: Vec<ContentId>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, QueueState>, QueueError> {
        self.inner
            .0
            .lock()
            .map_err(|_| QueueError::Unavailable("memory queue lock poisoned".to_string()))
    }

    /// Items waiting to be popped, oldest first
    pub fn pending(&self) -> Result<Vec<ContentId>, QueueError> {
        Ok(self.state()?.pending.iter().cloned().collect())
    }

    /// Popped but not yet acknowledged
    pub fn in_flight(&self) -> Result<Vec<ContentId>, QueueError> {
        let state = self.state()?;
        let mut items: Vec<ContentId> = state
            .in_flight
            .iter()
            .flat_map(|(item, &n)| std::iter::repeat(item.clone()).take(n))
            .collect();
        items.sort();
        Ok(items)
    }

    /// Every acknowledgment in the order it happened
    pub fn acknowledged(&self) -> Result<Vec<ContentId>, QueueError> {
        Ok(self.state()?.acknowledged.clone())
    }
}

impl WorkQueue for MemoryQueue {
    fn push(&self, item: &ContentId) -> Result<(), QueueError> {
        self.state()?.pending.push_back(item.clone());
        self.inner.1.notify_one();
        Ok(())
    }

    fn pop(&self, cancel: &Cancellation) -> Result<ContentId, QueueError> {
        let mut state = self.state()?;
        loop {
            if cancel.is_cancelled() {
                return Err(QueueError::Interrupted);
            }
            if let Some(item) = state.pending.pop_front() {
                *state.in_flight.entry(item.clone()).or_insert(0) += 1;
                return Ok(item);
            }
            // Cancellation does not notify, so wake up periodically
            let (guard, _) = self
                .inner
                .1
                .wait_timeout(state, DEFAULT_POLL_INTERVAL)
                .map_err(|_| QueueError::Unavailable("memory queue lock poisoned".to_string()))?;
            state = guard;
        }
    }

    fn acknowledge(&self, item: &ContentId) -> Result<(), QueueError> {
        let mut state = self.state()?;
        let remaining = match state.in_flight.get_mut(item) {
            Some(n) => {
                *n -= 1;
                *n
            }
            None => return Err(QueueError::NotInFlight(item.clone())),
        };
        if remaining == 0 {
            state.in_flight.remove(item);
        }
        state.acknowledged.push(item.clone());
        Ok(())
    }

    fn contains(&self, item: &ContentId) -> Result<bool, QueueError> {
        let state = self.state()?;
        Ok(state.in_flight.contains_key(item) || state.pending.contains(item))
    }
}

impl ErrorChannel for MemoryQueue {
    fn publish(&self, item: &ContentId) -> Result<(), QueueError> {
        self.push(item)
    }
}
