use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use taskline_events::SequentialIds;

use crate::config::QueueConfig;
use crate::queue::Queue;

fn queue_with(config: QueueConfig) -> Queue<u32> {
    Queue::with_id_source(config, Arc::new(SequentialIds::new("task"))).unwrap()
}

#[tokio::test]
async fn test_options_start_from_config() {
    let config = QueueConfig {
        default_retry_limit: 2,
        default_fire_and_forget: true,
        ..Default::default()
    };
    let builder = queue_with(config).dispatch_sync(|_, _| Ok(()));

    assert_eq!(builder.options().retries(), 2);
    assert!(builder.options().is_fire_and_forget());
}

#[tokio::test]
async fn test_with_is_cumulative() {
    let builder = queue_with(QueueConfig::default())
        .dispatch_sync(|_, _| Ok(()))
        .with(TaskOptions::new().retry_limit(10))
        .with(TaskOptions::new().fire_and_forget(true))
        .with(TaskOptions::new().retry_limit(1));

    assert_eq!(builder.options().retry_limit, Some(1));
    assert_eq!(builder.options().fire_and_forget, Some(true));
}

#[tokio::test]
async fn test_ids_come_from_source() {
    let queue = queue_with(QueueConfig::default());
    let first = queue.dispatch_sync(|_, _| Ok(()));
    let second = queue.dispatch_sync(|_, _| Ok(()));

    assert_eq!(first.id(), "task-1");
    assert_eq!(second.id(), "task-2");

    let handle = second.submit();
    assert_eq!(handle.id(), "task-2");
    let _ = first.submit().await;
    let _ = handle.await;
}

#[tokio::test]
async fn test_await_builder_resolves() {
    let queue = queue_with(QueueConfig::default());
    let value = queue
        .dispatch(|resolve, _reject| async move {
            tokio::task::yield_now().await;
            resolve.resolve(7);
            Ok(())
        })
        .await;

    assert_eq!(value, Ok(7));
}

#[tokio::test]
async fn test_handle_abandoned_without_settle() {
    let queue = queue_with(QueueConfig::default());
    let outcome = queue.dispatch_sync(|_, _| Ok(())).submit().await;

    assert_eq!(outcome, Err(TaskError::Abandoned));
}

#[tokio::test]
async fn test_handle_waits_for_final_failure() {
    let queue = queue_with(QueueConfig::default());
    let runs = Arc::new(AtomicU32::new(0));
    let counter = runs.clone();

    let outcome = queue
        .dispatch_sync(move |_resolve, reject| {
            let run = counter.fetch_add(1, Ordering::SeqCst) + 1;
            reject.reject(format!("attempt {run}"));
            Ok(())
        })
        .with(TaskOptions::new().retry_limit(2))
        .await;

    assert_eq!(outcome, Err(TaskError::rejected("attempt 3")));
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_handle_resolves_after_retry() {
    let queue = queue_with(QueueConfig::default());
    let runs = Arc::new(AtomicU32::new(0));
    let counter = runs.clone();

    let outcome = queue
        .dispatch_sync(move |resolve, reject| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                reject.reject("flaky");
            } else {
                resolve.resolve(99);
            }
            Ok(())
        })
        .with(TaskOptions::new().retry_limit(3))
        .await;

    assert_eq!(outcome, Ok(99));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retry_limit_above_configured_maximum_is_honored() {
    // The maximum only bounds the configured default.
    let queue = queue_with(QueueConfig::default());
    let runs = Arc::new(AtomicU32::new(0));
    let counter = runs.clone();

    let outcome = queue
        .dispatch_sync(move |_resolve, _reject| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(TaskError::rejected("E"))
        })
        .with(TaskOptions::new().retry_limit(150))
        .await;

    assert_eq!(outcome, Err(TaskError::rejected("E")));
    assert_eq!(runs.load(Ordering::SeqCst), 151);
    assert_eq!(queue.metrics().retries, 150);
}

#[tokio::test]
async fn test_then_ok_delivers_value() {
    let queue = queue_with(QueueConfig::default());
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    queue
        .dispatch_sync(|resolve, _| {
            resolve.resolve(5);
            Ok(())
        })
        .then_ok(move |v| sink.lock().push(v));
    queue.idle().await;

    assert_eq!(*received.lock(), vec![5]);
}
