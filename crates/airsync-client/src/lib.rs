//! airsync client - HTTP transport and sync loops
//!
//! Provides:
//! - The request/response pipeline over HTTP (query encoding, headers,
//!   body framing, response decoding)
//! - Autodiscover and OPTIONS capability discovery
//! - The `Sync` merge loop that follows `MoreAvailable`
//! - Bounded polling helpers
//!
//! ## Modules
//!
//! - [`client`] - [`AirSyncClient`], the HTTP implementation of
//!   [`IExchange`](airsync_core::ports::IExchange)
//! - [`resync`] - multi-round `Sync` merging
//! - [`poll`] - repeat-until helpers

pub mod client;
pub mod poll;
pub mod resync;

pub use client::AirSyncClient;
pub use poll::{poll_until, PollPolicy};
pub use resync::{sync_until_exhausted, ResyncOptions};
