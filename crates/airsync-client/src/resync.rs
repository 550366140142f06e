//! Sync merge loop
//!
//! A `Sync` request may need several round trips: while the server answers
//! with `MoreAvailable`, the client re-issues the request with the sync key
//! it just received. This module drives that loop and folds the rounds into
//! one logical response.
//!
//! ## Round flow
//!
//! 1. **Issue**: send the current request (cancellable)
//! 2. **Inspect**: no collection ends the call with
//!    [`SyncStatus::NoCollection`]; a non-success status ends it with
//!    [`SyncStatus::Failed`] without merging that round
//! 3. **Merge**: append the round's changes and copy its sync key into the
//!    next request
//! 4. **Done**: once a round has no `MoreAvailable`, the merged `Commands`
//!    element replaces the one in the final round's document
//!
//! Only the first collection of each response is merged.

use std::time::Duration;

use airsync_core::config::Config;
use airsync_core::domain::sync::{splice_commands, SyncRound};
use airsync_core::domain::{
    AirSyncError, AirSyncResult, RawRequest, SyncAccumulator, SyncOutcome, SyncStatus,
};
use airsync_core::ports::IExchange;
use airsync_core::xml::set_first_text;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Limits of one sync call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncOptions {
    /// Round trips allowed before giving up with
    /// [`AirSyncError::RoundLimitExceeded`]
    pub max_rounds: u32,
    /// Pause between rounds
    pub round_delay: Duration,
}

impl ResyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_rounds: config.sync.max_rounds,
            round_delay: config.round_delay(),
        }
    }
}

impl Default for ResyncOptions {
    fn default() -> Self {
        Self {
            max_rounds: 50,
            round_delay: Duration::ZERO,
        }
    }
}

/// Runs `initial` until the server has no more data for its first collection
///
/// # Errors
/// - Any error from the exchange, unchanged (transport errors are not retried)
/// - [`AirSyncError::Cancelled`] when `cancel` fires before or during a round
/// - [`AirSyncError::RoundLimitExceeded`] when the server still reports more
///   data after `options.max_rounds` rounds
pub async fn sync_until_exhausted<E>(
    exchange: &E,
    initial: &RawRequest,
    options: &ResyncOptions,
    cancel: &CancellationToken,
) -> AirSyncResult<SyncOutcome>
where
    E: IExchange + ?Sized,
{
    let mut request = initial.clone();
    let mut changes = SyncAccumulator::new();
    let mut sync_key: Option<String> = None;
    let mut rounds = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(AirSyncError::Cancelled);
        }
        if rounds >= options.max_rounds {
            warn!(rounds, "Sync round limit reached with more data pending");
            return Err(AirSyncError::RoundLimitExceeded { rounds });
        }
        rounds += 1;

        let mut response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AirSyncError::Cancelled),
            result = exchange.send(&request) => result?,
        };

        let round = match SyncRound::parse(&response.xml)? {
            Some(round) if round.status.is_some() => round,
            _ => {
                debug!(round = rounds, "Sync response has no collection status");
                return Ok(SyncOutcome {
                    response,
                    changes,
                    rounds,
                    status: SyncStatus::NoCollection,
                    sync_key,
                });
            }
        };

        if !round.is_success() {
            let status = round.status.unwrap_or_default();
            warn!(round = rounds, status = %status, "Sync round failed");
            return Ok(SyncOutcome {
                response,
                changes,
                rounds,
                status: SyncStatus::Failed(status),
                sync_key,
            });
        }

        if round.sync_key.is_some() {
            sync_key = round.sync_key.clone();
        }
        let round_changes = round.changes.len();
        changes.extend(round.changes);

        debug!(
            round = rounds,
            changes = round_changes,
            total = changes.len(),
            more_available = round.more_available,
            "Merged sync round"
        );

        if !round.more_available {
            response.xml = splice_commands(&response.xml, &changes.render_commands())?;
            info!(
                rounds,
                adds = changes.adds.len(),
                changes = changes.changes.len(),
                deletes = changes.deletes.len(),
                soft_deletes = changes.soft_deletes.len(),
                "Sync completed"
            );
            return Ok(SyncOutcome {
                response,
                changes,
                rounds,
                status: SyncStatus::Completed,
                sync_key,
            });
        }

        if let Some(key) = round.sync_key.as_deref() {
            request = request.with_body(set_first_text(&request.body, "Collection", "SyncKey", key)?);
        }

        if !options.round_delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AirSyncError::Cancelled),
                _ = tokio::time::sleep(options.round_delay) => {}
            }
        }
    }
}
