//! End-to-end single-node word count (scenario S1) and a second run with a
//! deliberately skewed key distribution (scenario S6), both driven
//! entirely in-process over loopback gRPC.

use std::collections::HashMap;
use std::time::Duration;

use mr_chord::chord_proto::chord_client::ChordClient;
use mr_chord::chord_proto::{AwaitJobRequest, KeyValue, SubmitJobRequest};
use mr_chord::config::Config;
use mr_chord::runtime;

async fn start_singleton_node(address: &str) {
    let config = Config {
        request_timeout: Duration::from_millis(200),
        stabilize_period: Duration::from_millis(50),
        fix_fingers_period: Duration::from_millis(20),
        check_predecessor_period: Duration::from_millis(100),
        ..Config::default()
    };
    let handles = runtime::bootstrap(address.to_string(), None, config)
        .await
        .expect("singleton bootstrap never contacts a peer and cannot fail");
    tokio::spawn(async move {
        let _ = runtime::serve(handles).await;
    });
    // give the listener a moment to bind before the test dials it.
    tokio::time::sleep(Duration::from_millis(100)).await;
}

async fn submit_and_await(entry: &str, job_id: &str, lines: &[&str]) -> HashMap<String, String> {
    let mut client = ChordClient::connect(format!("http://{}", entry))
        .await
        .expect("loopback connect should succeed once the node is listening");

    let items = lines
        .iter()
        .enumerate()
        .map(|(i, line)| KeyValue {
            key: i.to_string(),
            value: line.to_string(),
        })
        .collect();

    client
        .submit_job(tonic::Request::new(SubmitJobRequest {
            job_id: job_id.to_string(),
            items,
            map_kernel_id: "split_words".to_string(),
            reduce_kernel_id: "sum_counts".to_string(),
            kernel_args_json: "null".to_string(),
        }))
        .await
        .expect("submit_job should be accepted");

    let response = client
        .await_job_result(tonic::Request::new(AwaitJobRequest {
            job_id: job_id.to_string(),
        }))
        .await
        .expect("await_job_result should return")
        .into_inner();

    assert!(!response.failed, "job failed: {}", response.error);
    response.results.into_iter().map(|kv| (kv.key, kv.value)).collect()
}

#[tokio::test]
async fn single_node_word_count() {
    start_singleton_node("127.0.0.1:47601").await;

    let counts = submit_and_await(
        "127.0.0.1:47601",
        "wc-basic",
        &["the quick brown fox", "the lazy fox sleeps", "the fox runs"],
    )
    .await;

    assert_eq!(counts.get("the").map(String::as_str), Some("3"));
    assert_eq!(counts.get("fox").map(String::as_str), Some("3"));
    assert_eq!(counts.get("lazy").map(String::as_str), Some("1"));
    assert_eq!(counts.get("quick").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn skewed_reduce_key_still_aggregates_correctly() {
    start_singleton_node("127.0.0.1:47602").await;

    // every line repeats the same single word: one reduce key receives
    // every emission in the job, the rest of the keyspace is empty.
    let lines: Vec<&str> = std::iter::repeat("hotkey").take(200).collect();
    let counts = submit_and_await("127.0.0.1:47602", "wc-skew", &lines).await;

    assert_eq!(counts.len(), 1);
    assert_eq!(counts.get("hotkey").map(String::as_str), Some("200"));
}
