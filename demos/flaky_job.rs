//! Flaky Job
//!
//! Retries a job that fails a few times before succeeding, and shows an
//! unrelated failure escaping the loop.
//!
//! Key concepts:
//! - Catch entries matched through a kind hierarchy
//! - Handlers observing every caught error
//! - A retry policy loaded from JSON
//!
//! Run with: cargo run --example flaky_job

use std::cell::Cell;
use tracing_subscriber::EnvFilter;
use waypoint::error_kinds;
use waypoint::retry::{Catch, Repeater, RetryError, RetryPolicy};

error_kinds! {
    enum JobKind {
        Network,
        Timeout: [Network],
        Refused: [Network],
        Corrupt,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("waypoint=debug")),
        )
        .with_target(false)
        .init();

    let policy: RetryPolicy = serde_json::from_str(r#"{ "max_attempts": 8, "timeout_ms": 5000 }"#)?;

    let calls = Cell::new(0);
    let retries = Cell::new(0);
    let mut repeater = Repeater::new(
        policy.clone(),
        JobKind::hierarchy(),
        vec![Catch::with_handler(JobKind::Network, |kind: &JobKind| {
            retries.set(retries.get() + 1);
            println!("retrying after {}", kind.name());
        })],
    );

    let value = repeater.run(|| {
        calls.set(calls.get() + 1);
        match calls.get() {
            1 | 2 => Err(JobKind::Timeout),
            3 => Err(JobKind::Refused),
            n => Ok(n * 10),
        }
    });
    println!("job returned {value:?} after {} calls", calls.get());

    let mut strict: Repeater<JobKind> =
        Repeater::new(policy, JobKind::hierarchy(), vec![Catch::kind(JobKind::Network)]);
    match strict.run(|| Err::<(), _>(JobKind::Corrupt)) {
        Err(RetryError::Unrecovered(kind)) => println!("gave up on {}", kind.name()),
        other => println!("unexpected: {other:?}"),
    }

    drop(repeater);
    println!("{} retries in total", retries.get());
    Ok(())
}
