//! Fixed-interval polling with a deadline

use crate::nonempty::NonEmpty;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// How often to look for mail and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(24 * 5);

    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_TIMEOUT)
    }
}

/// Why [`poll_until_found`] stopped without a result.
#[derive(Debug)]
pub enum PollError<E> {
    /// Every attempt came back empty until the deadline.
    TimedOut { waited: Duration },
    /// An attempt failed outright; polling stopped there.
    Failed(E),
}

/// Run `attempt` until it yields at least one item.
///
/// The first attempt runs immediately. After an empty attempt the
/// loop gives up if `policy.timeout` has elapsed since the start,
/// otherwise it sleeps `policy.interval` and tries again. Sleeping
/// suspends only the calling task.
///
/// An `Err` from `attempt` ends the loop at once; it is never treated
/// as "nothing yet".
///
/// # Errors
///
/// [`PollError::TimedOut`] once the deadline passes with no items, or
/// [`PollError::Failed`] carrying the attempt's own error.
pub async fn poll_until_found<T, E, F, Fut>(
    policy: PollPolicy,
    mut attempt: F,
) -> Result<NonEmpty<T>, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let started = Instant::now();
    let mut round = 1u32;
    loop {
        let found = attempt().await.map_err(PollError::Failed)?;
        if let Some(found) = NonEmpty::from_vec(found) {
            debug!("Poll round {} found {} item(s)", round, found.len());
            return Ok(found);
        }

        let waited = started.elapsed();
        if waited >= policy.timeout {
            debug!("Giving up after {} rounds ({:?})", round, waited);
            return Err(PollError::TimedOut { waited });
        }

        debug!("Poll round {} empty, retrying in {:?}", round, policy.interval);
        sleep(policy.interval).await;
        round += 1;
    }
}
