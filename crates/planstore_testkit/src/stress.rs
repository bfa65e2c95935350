//! Stress helpers for concurrent access.
//!
//! These helpers drive many threads against one server at once and tally
//! the status codes, so tests can assert that at most one writer wins per
//! precondition state.

use crate::fixtures::{etag_of, TestServer};
use planstore_server::status;
use planstore_storage::Connect;
use serde_json::json;
use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

/// Status code tally from a concurrent run.
#[derive(Debug, Clone, Default)]
pub struct RaceOutcome {
    /// Count of responses per status code.
    pub statuses: BTreeMap<u16, usize>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl RaceOutcome {
    fn record(&mut self, status: u16) {
        *self.statuses.entry(status).or_default() += 1;
    }

    /// Number of responses with `status`.
    pub fn count(&self, status: u16) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }

    /// Total number of responses.
    pub fn total(&self) -> usize {
        self.statuses.values().sum()
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        for (status, count) in &self.statuses {
            println!("{}: {}", status, count);
        }
        println!("Duration: {:?}", self.duration);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Operations per thread (mixed runs only).
    pub operations_per_thread: usize,
    /// Number of distinct object ids (mixed runs only).
    pub object_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            operations_per_thread: 200,
            object_count: 4,
        }
    }
}

fn run_concurrently<C, F>(server: &TestServer<C>, threads: usize, op: F) -> RaceOutcome
where
    C: Connect,
    F: Fn(&TestServer<C>, usize) -> Vec<u16> + Sync,
{
    let start = Instant::now();
    let statuses: Vec<u16> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let op = &op;
                scope.spawn(move || op(server, t))
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().expect("stress thread panicked"))
            .collect()
    });

    let mut outcome = RaceOutcome::default();
    for status in statuses {
        outcome.record(status);
    }
    outcome.duration = start.elapsed();
    outcome
}

/// Has `threads` callers create `object_id` at the same time.
pub fn race_creates<C: Connect>(
    server: &TestServer<C>,
    object_id: &str,
    threads: usize,
) -> RaceOutcome {
    run_concurrently(server, threads, |server, t| {
        let doc = json!({"objectId": object_id, "writer": t});
        vec![server.create(&doc).status]
    })
}

/// Creates `object_id`, then has `threads` callers patch it at the same
/// time, all conditional on the creation etag.
pub fn race_conditional_patches<C: Connect>(
    server: &TestServer<C>,
    object_id: &str,
    threads: usize,
) -> RaceOutcome {
    let created = server.create(&json!({"objectId": object_id, "writer": null}));
    assert_eq!(created.status, status::CREATED, "setup create failed");
    let etag = etag_of(&created);

    run_concurrently(server, threads, |server, t| {
        let patch = json!({"writer": t});
        vec![server.patch(object_id, &patch, Some(&etag)).status]
    })
}

/// Runs a mix of creates, reads, patches and deletes over a small set of
/// ids. Every response must be one of the documented statuses.
pub fn stress_mixed_operations<C: Connect>(
    server: &TestServer<C>,
    config: &StressConfig,
) -> RaceOutcome {
    let object_count = config.object_count.max(1);
    let operations = config.operations_per_thread;

    run_concurrently(server, config.threads, |server, t| {
        (0..operations)
            .map(|i| {
                let id = format!("mixed-{}", (t + i) % object_count);
                match i % 4 {
                    0 => server.create(&json!({"objectId": id, "n": i})).status,
                    1 => server.get(&id).status,
                    2 => server.patch(&id, &json!({"n": i}), None).status,
                    _ => server.delete(&id).status,
                }
            })
            .collect()
    })
}
