use std::collections::HashSet;

use beacon_sink_memory::MemorySink;
use beacon_tracker::{Tracker, TrackerConfig};
use serde_json::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_deliver_each_event_once() {
    let sink = MemorySink::new();
    let config = TrackerConfig {
        batch_size: 7,
        flush_interval_ms: 5,
        ..TrackerConfig::default()
    };
    let tracker = Tracker::new(config, sink.clone()).unwrap();

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                for n in 0..250 {
                    tracker.track(format!("p{producer}-{n}"), json!({ "match": "m1" }));
                    if n % 50 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer.await.unwrap();
    }

    tracker.shutdown().await;

    let events = sink.events().await;
    let unique: HashSet<_> = events.iter().map(|event| event.name().to_string()).collect();

    assert_eq!(events.len(), 1000);
    assert_eq!(unique.len(), 1000);
    assert_eq!(tracker.queue_len(), 0);

    let stats = tracker.stats();
    assert_eq!(stats.tracked, 1000);
    assert_eq!(stats.events_delivered, 1000);
    assert_eq!(stats.failed_deliveries, 0);
}

#[tokio::test]
async fn test_recovers_after_sink_outage() {
    let sink = MemorySink::failing();
    let config = TrackerConfig {
        batch_size: 3,
        ..TrackerConfig::default()
    };
    let tracker = Tracker::new(config, sink.clone()).unwrap();

    for n in 0..3 {
        tracker.track(format!("e{n}"), json!({}));
    }
    sink.wait_for_attempts(1).await;
    tokio::task::yield_now().await;

    assert_eq!(tracker.queue_len(), 3);

    sink.set_failing(false);
    tracker.shutdown().await;

    let names: Vec<_> = sink
        .events()
        .await
        .iter()
        .map(|event| event.name().to_string())
        .collect();
    assert_eq!(names, ["e0", "e1", "e2"]);
    assert_eq!(tracker.stats().failed_deliveries, 1);
}
