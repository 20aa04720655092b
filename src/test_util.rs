use std::{sync::Arc, time::Duration};

use tokio::time::Instant;

use crate::{
    client::{self, mock},
    logging,
};

pub fn trace_init() {
    let levels = std::env::var("TEST_LOG").unwrap_or_else(|_| "error".to_string());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(levels)
        .with_test_writer()
        .try_init();
}

/// Timers may fire up to a millisecond late, even with paused time.
const TIMER_SLACK: Duration = Duration::from_millis(10);

/// Asserts that `expected` has passed since `start`, give or take timer
/// granularity.
#[track_caller]
pub fn assert_elapsed(start: Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + TIMER_SLACK,
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}

/// A fresh mock client, both as itself and as the trait object operations take.
pub fn mock_client() -> (Arc<mock::Client>, Arc<dyn client::Client>) {
    let client = Arc::new(mock::Client::new());
    let dyn_client = Arc::clone(&client) as Arc<dyn client::Client>;
    (client, dyn_client)
}

pub fn mock_logger() -> (Arc<logging::mock::Logger>, Arc<dyn logging::Logger>) {
    let logger = Arc::new(logging::mock::Logger::new());
    let dyn_logger = Arc::clone(&logger) as Arc<dyn logging::Logger>;
    (logger, dyn_logger)
}
