//! Context-bounded polling.

use std::{future::Future, time::Duration};

use tokio::time::{MissedTickBehavior, interval};

use crate::context::{self, Context};

/// Evaluate `condition` every `period` until it reports `true`, fails, or
/// `ctx` is done.
///
/// With `immediate` set the first check runs right away, otherwise after one
/// `period`. Ticks are measured from the start of the previous tick, and at
/// most one check is in flight at a time. Returns the number of checks made.
///
/// # Panics
///
/// Panics if `period` is zero.
pub async fn until_done<F, Fut, E>(
    ctx: &Context,
    period: Duration,
    immediate: bool,
    mut condition: F,
) -> Result<usize, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: From<context::Error>,
{
    assert!(!period.is_zero(), "poll period must be non-zero");
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    if !immediate {
        // The first tick of an interval completes immediately.
        ticker.tick().await;
    }

    let mut checks = 0;
    loop {
        ctx.wrap(ticker.tick()).await?;
        checks += 1;
        if ctx.run(condition()).await? {
            return Ok(checks);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::time::Instant;

    use super::*;
    use crate::test_util::assert_elapsed;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Context(context::Error),
        Condition,
    }

    impl From<context::Error> for TestError {
        fn from(error: context::Error) -> Self {
            TestError::Context(error)
        }
    }

    const PERIOD: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn immediate_first_check() {
        tokio::time::pause();

        let start = Instant::now();
        let checks = until_done::<_, _, TestError>(&Context::background(), PERIOD, true, || async {
            Ok(true)
        })
        .await;
        assert_eq!(checks, Ok(1));
        assert_elapsed(start, Duration::ZERO);
    }

    #[tokio::test]
    async fn delayed_first_check() {
        tokio::time::pause();

        let start = Instant::now();
        let checks = until_done::<_, _, TestError>(&Context::background(), PERIOD, false, || async {
            Ok(true)
        })
        .await;
        assert_eq!(checks, Ok(1));
        assert_elapsed(start, PERIOD);
    }

    #[tokio::test]
    async fn checks_at_fixed_period() {
        tokio::time::pause();

        let start = Instant::now();
        let calls = Arc::new(AtomicUsize::new(0));
        let checks = until_done::<_, _, TestError>(&Context::background(), PERIOD, true, || {
            let calls = Arc::clone(&calls);
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) == 4) }
        })
        .await;
        assert_eq!(checks, Ok(5));
        assert_elapsed(start, PERIOD * 4);
    }

    #[tokio::test]
    #[should_panic(expected = "poll period must be non-zero")]
    async fn zero_period_panics() {
        let _ = until_done::<_, _, TestError>(&Context::background(), Duration::ZERO, true, || {
            async { Ok(true) }
        })
        .await;
    }

    #[tokio::test]
    async fn condition_error_stops_polling() {
        tokio::time::pause();

        let calls = Arc::new(AtomicUsize::new(0));
        let result = until_done::<_, _, TestError>(&Context::background(), PERIOD, true, || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 2 {
                    Err(TestError::Condition)
                } else {
                    Ok(false)
                }
            }
        })
        .await;
        assert_eq!(result, Err(TestError::Condition));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn deadline_stops_polling() {
        tokio::time::pause();

        let ctx = Context::background().with_timeout(Duration::from_millis(3500));
        let calls = Arc::new(AtomicUsize::new(0));
        let result = until_done::<_, _, TestError>(&ctx, PERIOD, true, || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            }
        })
        .await;
        assert_eq!(
            result,
            Err(TestError::Context(context::Error::DeadlineExceeded))
        );
        // Checks at 0s, 1s, 2s and 3s.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cancellation_stops_polling() {
        tokio::time::pause();

        let ctx = Context::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            canceller.cancel();
        });

        let result =
            until_done::<_, _, TestError>(&ctx, PERIOD, true, || async { Ok(false) }).await;
        assert_eq!(result, Err(TestError::Context(context::Error::Cancelled)));
    }

    #[tokio::test]
    async fn cancelled_context_never_checks() {
        let ctx = Context::background();
        ctx.cancel();

        let calls = Arc::new(AtomicUsize::new(0));
        let result = until_done::<_, _, TestError>(&ctx, PERIOD, true, || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
        })
        .await;
        assert_eq!(result, Err(TestError::Context(context::Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
