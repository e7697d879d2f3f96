use std::thread;
use std::time::Duration;

use crate::cancel::Cancellation;
use crate::content::ContentId;
use crate::queue::{
    ErrorChannel, MemoryQueue, QueueDepth, QueueError, SqliteQueue, WorkQueue, error_channel_name,
};

fn ids(names: &[&str]) -> Vec<ContentId> {
    names.iter().map(|name| ContentId::from(*name)).collect()
}

// ========================================================================
// SQLite queue
// ========================================================================

#[test]
fn test_sqlite_fifo_order() {
    let queue = SqliteQueue::new_in_memory("sources").unwrap();
    for id in ids(&["a", "b", "c"]) {
        queue.push(&id).unwrap();
    }

    let cancel = Cancellation::new();
    let popped: Vec<ContentId> = (0..3).map(|_| queue.pop(&cancel).unwrap()).collect();
    assert_eq!(popped, ids(&["a", "b", "c"]));
    assert_eq!(queue.try_pop().unwrap(), None);
}

#[test]
fn test_sqlite_double_acknowledge() {
    let queue = SqliteQueue::new_in_memory("sources").unwrap();
    let id = ContentId::from("a");
    queue.push(&id).unwrap();

    let popped = queue.try_pop().unwrap().unwrap();
    queue.acknowledge(&popped).unwrap();

    let err = queue.acknowledge(&popped).unwrap_err();
    assert!(matches!(err, QueueError::NotInFlight(item) if item == id));
}

#[test]
fn test_sqlite_acknowledge_requires_pop() {
    let queue = SqliteQueue::new_in_memory("sources").unwrap();
    let id = ContentId::from("a");
    queue.push(&id).unwrap();

    assert!(matches!(
        queue.acknowledge(&id),
        Err(QueueError::NotInFlight(_))
    ));
    assert_eq!(queue.depth().unwrap(), QueueDepth { pending: 1, in_flight: 0 });
}

#[test]
fn test_sqlite_acknowledge_is_per_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.sqlite3");
    let first = SqliteQueue::open(&path, "sources").unwrap();
    let second = SqliteQueue::open(&path, "sources").unwrap();

    first.push(&ContentId::from("a")).unwrap();
    let popped = first.try_pop().unwrap().unwrap();

    assert!(matches!(
        second.acknowledge(&popped),
        Err(QueueError::NotInFlight(_))
    ));
    first.acknowledge(&popped).unwrap();
}

#[test]
fn test_sqlite_requeue_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.sqlite3");

    {
        let crashed = SqliteQueue::open(&path, "sources").unwrap();
        crashed.push(&ContentId::from("a")).unwrap();
        crashed.push(&ContentId::from("b")).unwrap();
        crashed.try_pop().unwrap().unwrap();
    }

    let queue = SqliteQueue::open(&path, "sources").unwrap();
    assert_eq!(queue.depth().unwrap(), QueueDepth { pending: 1, in_flight: 1 });
    assert_eq!(queue.requeue_in_flight().unwrap(), 1);
    assert_eq!(queue.depth().unwrap(), QueueDepth { pending: 2, in_flight: 0 });

    // The redelivered item keeps its place at the front
    assert_eq!(queue.try_pop().unwrap(), Some(ContentId::from("a")));
}

#[test]
fn test_sqlite_drain_into() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.sqlite3");
    let primary = SqliteQueue::open(&path, "sources").unwrap();
    let errors = SqliteQueue::open(&path, error_channel_name("sources")).unwrap();

    errors.publish(&ContentId::from("x")).unwrap();
    errors.publish(&ContentId::from("y")).unwrap();

    assert_eq!(errors.drain_into(&primary).unwrap(), 2);
    assert_eq!(errors.depth().unwrap(), QueueDepth { pending: 0, in_flight: 0 });
    assert_eq!(primary.try_pop().unwrap(), Some(ContentId::from("x")));
    assert_eq!(primary.try_pop().unwrap(), Some(ContentId::from("y")));
}

#[test]
fn test_sqlite_queues_are_isolated_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.sqlite3");
    let primary = SqliteQueue::open(&path, "sources").unwrap();
    let errors = SqliteQueue::open(&path, "sources:errors").unwrap();

    errors.publish(&ContentId::from("x")).unwrap();
    assert_eq!(primary.try_pop().unwrap(), None);
}

#[test]
fn test_sqlite_pop_interrupted_when_idle() {
    let queue = SqliteQueue::new_in_memory("sources")
        .unwrap()
        .poll_interval(Duration::from_millis(10));
    let cancel = Cancellation::new();

    let canceller = cancel.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    assert!(matches!(queue.pop(&cancel), Err(QueueError::Interrupted)));
    handle.join().unwrap();
}

#[test]
fn test_sqlite_concurrent_pops_claim_distinct_items() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.sqlite3");
    let producer = SqliteQueue::open(&path, "sources").unwrap();
    for n in 0..40 {
        producer.push(&ContentId::from(format!("item-{}", n))).unwrap();
    }

    let mut claimed: Vec<ContentId> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                scope.spawn(move || {
                    let queue = SqliteQueue::open(&path, "sources").unwrap();
                    let mut mine = Vec::new();
                    while let Some(item) = queue.try_pop().unwrap() {
                        queue.acknowledge(&item).unwrap();
                        mine.push(item);
                    }
                    mine
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    claimed.sort();
    claimed.dedup();
    assert_eq!(claimed.len(), 40);
}

#[test]
fn test_sqlite_contains_pending_and_in_flight() {
    let queue = SqliteQueue::new_in_memory("sources").unwrap();
    let id = ContentId::from("a");
    assert!(!queue.contains(&id).unwrap());

    queue.push(&id).unwrap();
    assert!(queue.contains(&id).unwrap());

    assert_eq!(queue.try_pop().unwrap(), Some(id.clone()));
    assert!(queue.contains(&id).unwrap());

    queue.acknowledge(&id).unwrap();
    assert!(!queue.contains(&id).unwrap());
}

#[test]
fn test_sqlite_contains_ignores_other_queues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.sqlite3");
    let primary = SqliteQueue::open(&path, "sources").unwrap();
    let errors = SqliteQueue::open(&path, error_channel_name("sources")).unwrap();

    errors.publish(&ContentId::from("a")).unwrap();
    assert!(errors.contains(&ContentId::from("a")).unwrap());
    assert!(!primary.contains(&ContentId::from("a")).unwrap());
}

// ========================================================================
// Memory queue
// ========================================================================

#[test]
fn test_memory_fifo_and_acknowledge() {
    let queue = MemoryQueue::new();
    let cancel = Cancellation::new();
    for id in ids(&["a", "b"]) {
        queue.push(&id).unwrap();
    }

    let first = queue.pop(&cancel).unwrap();
    assert_eq!(first, ContentId::from("a"));
    assert_eq!(queue.in_flight().unwrap(), ids(&["a"]));

    queue.acknowledge(&first).unwrap();
    assert!(matches!(
        queue.acknowledge(&first),
        Err(QueueError::NotInFlight(_))
    ));
    assert_eq!(queue.acknowledged().unwrap(), ids(&["a"]));
    assert_eq!(queue.pending().unwrap(), ids(&["b"]));
}

#[test]
fn test_memory_duplicate_items_tracked_separately() {
    let queue = MemoryQueue::new();
    let cancel = Cancellation::new();
    let id = ContentId::from("a");
    queue.push(&id).unwrap();
    queue.push(&id).unwrap();

    queue.pop(&cancel).unwrap();
    queue.pop(&cancel).unwrap();
    queue.acknowledge(&id).unwrap();
    queue.acknowledge(&id).unwrap();
    assert!(queue.acknowledge(&id).is_err());
}

#[test]
fn test_memory_pop_wakes_on_push() {
    let queue = MemoryQueue::new();
    let producer = queue.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        producer.push(&ContentId::from("late")).unwrap();
    });

    let popped = queue.pop(&Cancellation::new()).unwrap();
    assert_eq!(popped, ContentId::from("late"));
    handle.join().unwrap();
}

#[test]
fn test_memory_pop_interrupted_when_idle() {
    let queue = MemoryQueue::new();
    let cancel = Cancellation::new();
    cancel.cancel();
    assert!(matches!(queue.pop(&cancel), Err(QueueError::Interrupted)));
}

#[test]
fn test_memory_contains_pending_and_in_flight() {
    let queue = MemoryQueue::new();
    let cancel = Cancellation::new();
    let id = ContentId::from("a");
    assert!(!queue.contains(&id).unwrap());

    queue.push(&id).unwrap();
    assert!(queue.contains(&id).unwrap());

    queue.pop(&cancel).unwrap();
    assert!(queue.contains(&id).unwrap());

    queue.acknowledge(&id).unwrap();
    assert!(!queue.contains(&id).unwrap());
}
