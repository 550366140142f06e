//! Bounded polling helpers
//!
//! Repeat an exchange until its response satisfies a condition, waiting a
//! fixed delay between attempts. Errors from the action are returned at
//! once; only an unmet condition is retried.

use std::future::Future;
use std::time::Duration;

use airsync_core::config::Config;
use airsync_core::domain::{AirSyncError, AirSyncResult, RawRequest, RawResponse};
use airsync_core::ports::IExchange;
use airsync_core::xml::count_elements;
use tracing::{debug, trace};

/// Attempt budget and spacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.polling.max_attempts, config.poll_delay())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(2))
    }
}

/// Calls `action` until `predicate` accepts its output
///
/// The delay is applied between attempts, never after the last one. A policy
/// with zero attempts fails immediately with [`AirSyncError::PollTimeout`].
pub async fn poll_until<T, F, Fut, P>(
    policy: &PollPolicy,
    mut action: F,
    mut predicate: P,
) -> AirSyncResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AirSyncResult<T>>,
    P: FnMut(&T) -> bool,
{
    for attempt in 1..=policy.max_attempts {
        let value = action().await?;
        if predicate(&value) {
            debug!(attempt, "Poll condition met");
            return Ok(value);
        }
        trace!(attempt, max = policy.max_attempts, "Poll condition not met");
        if attempt < policy.max_attempts && !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
    }

    debug!(attempts = policy.max_attempts, "Poll gave up");
    Err(AirSyncError::PollTimeout {
        attempts: policy.max_attempts,
    })
}

/// Re-sends `request` until `predicate` accepts the response
pub async fn wait_for_response<E, P>(
    exchange: &E,
    request: &RawRequest,
    policy: &PollPolicy,
    predicate: P,
) -> AirSyncResult<RawResponse>
where
    E: IExchange + ?Sized,
    P: FnMut(&RawResponse) -> bool,
{
    poll_until(policy, || exchange.send(request), predicate).await
}

/// Waits until the decoded response contains `needle`
pub async fn wait_for_text<E>(
    exchange: &E,
    request: &RawRequest,
    policy: &PollPolicy,
    needle: &str,
) -> AirSyncResult<RawResponse>
where
    E: IExchange + ?Sized,
{
    wait_for_response(exchange, request, policy, |r| r.xml.contains(needle)).await
}

/// Waits until the response holds exactly `expected` elements named `name`
pub async fn wait_for_count<E>(
    exchange: &E,
    request: &RawRequest,
    policy: &PollPolicy,
    name: &str,
    expected: usize,
) -> AirSyncResult<RawResponse>
where
    E: IExchange + ?Sized,
{
    wait_for_response(exchange, request, policy, |r| {
        count_elements(&r.xml, name).is_ok_and(|n| n == expected)
    })
    .await
}

/// Waits until the response no longer mentions `needle`
pub async fn wait_for_none<E>(
    exchange: &E,
    request: &RawRequest,
    policy: &PollPolicy,
    needle: &str,
) -> AirSyncResult<RawResponse>
where
    E: IExchange + ?Sized,
{
    wait_for_response(exchange, request, policy, |r| !r.xml.contains(needle)).await
}
