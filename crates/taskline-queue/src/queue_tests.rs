use super::*;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use taskline_events::{LifecycleEvent, SequentialIds};

#[test]
fn test_with_config_rejects_invalid() {
    let config = QueueConfig {
        default_retry_limit: 5,
        max_retry_limit: 3,
        ..Default::default()
    };
    let result = Queue::<u32>::with_config(config);
    assert!(matches!(
        result,
        Err(QueueError::RetryLimitExceeded { requested: 5, max: 3 })
    ));
}

#[test]
fn test_on_accepts_any_name() {
    let queue: Queue<u32> = Queue::new();
    let id = queue.on("something-custom", |_: &QueueEvent| Ok(()));
    assert!(id.is_some());
    assert!(queue.events().has_subscription("something-custom", id.as_ref()));
}

#[test]
fn test_subscription_ids_from_source() {
    let queue: Queue<u32> =
        Queue::with_id_source(QueueConfig::default(), Arc::new(SequentialIds::new("q"))).unwrap();
    let id = queue.on(LifecycleEvent::Error, |_: &QueueEvent| Ok(()));
    assert_eq!(id.map(|id| id.to_string()), Some("q-1".to_string()));
}

#[test]
fn test_detach_one_and_all() {
    let queue: Queue<u32> = Queue::new();
    let first = queue.on(LifecycleEvent::Error, |_: &QueueEvent| Ok(())).unwrap();
    let second = queue.on(LifecycleEvent::Error, |_: &QueueEvent| Ok(())).unwrap();

    queue.detach(LifecycleEvent::Error, Some(&first));
    assert!(!queue.events().has_subscription(LifecycleEvent::Error, Some(&first)));
    assert!(queue.events().has_subscription(LifecycleEvent::Error, Some(&second)));

    queue.detach(LifecycleEvent::Error, None);
    assert!(!queue.events().has_subscription(LifecycleEvent::Error, None));
}

#[tokio::test]
async fn test_lifecycle_statistics() {
    let queue: Queue<u32> = Queue::new();
    let starts = Arc::new(AtomicU32::new(0));
    let counter = starts.clone();
    queue.on(LifecycleEvent::QueueStart, move |_: &QueueEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    queue.dispatch_sync(|resolve, _| {
        resolve.resolve(1);
        Ok(())
    })
    .then_ok(|_| {});
    queue.idle().await;

    assert_eq!(starts.load(Ordering::SeqCst), 1);
    let stats = queue.statistics();
    assert_eq!(stats.emitted_total, 1);
    assert_eq!(stats.emit_success_count, 1);
    assert_eq!(queue.metrics().cycles, 1);
    assert_eq!(queue.pending_len(), 0);
    assert!(!queue.is_draining());
}

#[tokio::test]
async fn test_clones_share_executor() {
    let queue: Queue<u32> = Queue::new();
    let other = queue.clone();
    let received = Arc::new(Mutex::new(Vec::new()));

    for (q, value) in [(&queue, 1), (&other, 2)] {
        let sink = received.clone();
        q.dispatch_sync(move |resolve, _| {
            resolve.resolve(value);
            Ok(())
        })
        .then_ok(move |v| sink.lock().push(v));
    }
    queue.idle().await;

    assert_eq!(*received.lock(), vec![1, 2]);
    assert_eq!(other.metrics().tasks_started, 2);
}
