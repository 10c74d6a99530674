//! `submit` + `awaitResults`: reads a newline-delimited input file, submits
//! a map/reduce job through any live ring member, polls until it finishes,
//! and prints the reduced key/value pairs.
//!
//! Exit codes: 0 success, 1 job failure, 2 ring unreachable.

use std::fs;

use clap::Parser;
use tonic::Request;

use mr_chord::chord_proto::chord_client::ChordClient;
use mr_chord::chord_proto::{AwaitJobRequest, KeyValue, SubmitJobRequest};
use mr_chord::cli::ClientCli;

#[tokio::main]
async fn main() {
    simple_logger::SimpleLogger::new().env().init().unwrap();
    let args = ClientCli::parse();

    let input = match fs::read_to_string(&args.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("failed to read {}: {}", args.input, e);
            std::process::exit(2);
        }
    };

    let items: Vec<KeyValue> = input
        .lines()
        .enumerate()
        .map(|(i, line)| KeyValue {
            key: i.to_string(),
            value: line.to_string(),
        })
        .collect();

    let mut client = match ChordClient::connect(format!("http://{}", args.entry)).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("could not reach {}: {}", args.entry, e);
            std::process::exit(2);
        }
    };

    let job_id = format!("job-{}", blake3::hash(input.as_bytes()).to_hex());
    let submit_result = client
        .submit_job(Request::new(SubmitJobRequest {
            job_id: job_id.clone(),
            items,
            map_kernel_id: args.map_kernel,
            reduce_kernel_id: args.reduce_kernel,
            kernel_args_json: "null".to_string(),
        }))
        .await;

    if let Err(e) = submit_result {
        eprintln!("submit failed: {}", e);
        std::process::exit(2);
    }

    let response = match client.await_job_result(Request::new(AwaitJobRequest { job_id })).await {
        Ok(resp) => resp.into_inner(),
        Err(e) => {
            eprintln!("awaiting job result failed: {}", e);
            std::process::exit(2);
        }
    };

    if response.failed {
        eprintln!("job failed: {}", response.error);
        std::process::exit(1);
    }

    let mut results = response.results;
    results.sort_by(|a, b| a.key.cmp(&b.key));
    for kv in results {
        println!("{}\t{}", kv.key, kv.value);
    }
}
