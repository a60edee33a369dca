//! Integration tests for futures, sequential collection and fan-in merging

use concord::future_flow::{await_all, fan_in, launch, launch_with, FutureState};
use concord::{DelaySource, JitterDelays, KernelError, NoDelay};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

/// Same compute delay on every call
struct Fixed(Duration);

impl DelaySource for Fixed {
    fn compute_delay(&self) -> Duration {
        self.0
    }

    fn think_delay(&self, _philosopher: usize) -> Duration {
        Duration::ZERO
    }

    fn eat_delay(&self, _philosopher: usize) -> Duration {
        Duration::ZERO
    }
}

fn fixed(ms: u64) -> Arc<dyn DelaySource> {
    Arc::new(Fixed(Duration::from_millis(ms)))
}

#[tokio::test(start_paused = true)]
async fn test_sequential_collection_keeps_input_order() {
    // Later inputs finish first
    let handles = vec![
        launch(5, fixed(300)),
        launch(8, fixed(200)),
        launch(12, fixed(100)),
    ];
    let results = await_all(handles).await.unwrap();
    assert_eq!(results, vec![25, 64, 144]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sequential_collection_under_random_delays() {
    for seed in 0..10u64 {
        let delays: Arc<dyn DelaySource> =
            Arc::new(JitterDelays::with_seed(Duration::from_millis(20), seed));
        let mut rng = fastrand::Rng::with_seed(seed);
        let inputs: Vec<i64> = (0..8).map(|_| rng.i64(-1000..1000)).collect();

        let handles = inputs
            .iter()
            .map(|&x| launch(x, Arc::clone(&delays)))
            .collect();
        let results = tokio::time::timeout(Duration::from_secs(5), await_all(handles))
            .await
            .expect("watchdog expired")
            .unwrap();

        let expected: Vec<i64> = inputs.iter().map(|x| x * x).collect();
        assert_eq!(results, expected, "seed {}", seed);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fan_in_reference_scenario() {
    let delays: Arc<dyn DelaySource> =
        Arc::new(JitterDelays::with_seed(Duration::from_millis(30), 42));
    let sources = [7, 9, 15, 4, 11]
        .into_iter()
        .map(|x| launch(x, Arc::clone(&delays)))
        .collect();

    let mut merged = fan_in(sources);
    let mut values = Vec::new();
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(item) = merged.recv().await {
            values.push(item.outcome.unwrap());
        }
    })
    .await;
    assert!(drained.is_ok(), "merged stream never closed");

    assert_eq!(values.len(), 5);
    values.sort();
    assert_eq!(values, vec![16, 49, 81, 121, 225]);

    // Closed stays closed
    assert!(merged.recv().await.is_none());

    let summary = merged.finish().await.unwrap();
    assert_eq!(summary.sources, 5);
    assert_eq!(summary.values_forwarded, 5);
    assert_eq!(summary.failed_sources, 0);
}

#[tokio::test(start_paused = true)]
async fn test_fan_in_is_first_ready_first_served() {
    let sources = vec![
        launch(1, fixed(400)),
        launch(2, fixed(100)),
        launch(3, fixed(300)),
        launch(4, fixed(200)),
    ];
    let output = fan_in(sources).drain().await.unwrap();
    assert_eq!(output.values, vec![4, 16, 9, 1]);
    assert!(output.failures.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fan_in_stays_open_until_last_source_closes() {
    let sources = vec![launch(2, fixed(10)), launch(3, fixed(1_000))];
    let mut merged = fan_in(sources);

    let first = merged.recv().await.unwrap();
    assert_eq!(first.outcome.unwrap(), 4);

    // The slow source is still pending, so the stream must not report closed
    let early = tokio::time::timeout(Duration::from_millis(500), merged.recv()).await;
    assert!(early.is_err());

    let second = merged.recv().await.unwrap();
    assert_eq!((second.source, second.outcome.unwrap()), (1, 9));
    assert!(merged.recv().await.is_none());
}

#[tokio::test]
async fn test_failed_source_is_tagged_not_fatal() {
    let good = launch(6, Arc::new(NoDelay));
    let bad = launch_with("falla", 0i64, Arc::new(NoDelay), |_: i64| -> i64 {
        panic!("producer failure")
    });
    let also_good = launch(10, Arc::new(NoDelay));

    let output = fan_in(vec![good, bad, also_good]).drain().await.unwrap();

    let mut values = output.values.clone();
    values.sort();
    assert_eq!(values, vec![36, 100]);
    assert_eq!(output.failures.len(), 1);
    let (source, err) = &output.failures[0];
    assert_eq!(*source, 1);
    assert!(matches!(err, KernelError::Abandoned { source_index: 1 }));
    assert_eq!(output.summary.failed_sources, 1);
}

#[tokio::test]
async fn test_merged_stream_implements_stream() {
    let sources = (1..=4).map(|x| launch(x, Arc::new(NoDelay))).collect();
    let mut values: Vec<i64> = fan_in(sources)
        .map(|item| item.outcome.unwrap())
        .collect()
        .await;
    values.sort();
    assert_eq!(values, vec![1, 4, 9, 16]);
}

#[tokio::test]
async fn test_abandoned_future_in_sequential_collection() {
    let handles = vec![
        launch(2, Arc::new(NoDelay)),
        launch_with("falla", 0i64, Arc::new(NoDelay), |_: i64| -> i64 {
            panic!("producer failure")
        }),
    ];
    let err = await_all(handles).await.unwrap_err();
    assert!(matches!(err, KernelError::Abandoned { source_index: 1 }));
}

#[tokio::test(start_paused = true)]
async fn test_future_lifecycle() {
    let mut handle = launch(4, fixed(100));
    assert_eq!(handle.state(), FutureState::Pending);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(handle.state(), FutureState::Delivered);

    assert_eq!(handle.recv().await, Some(16));
    assert_eq!(handle.state(), FutureState::Consumed);
    assert_eq!(handle.recv().await, None);
}
