//! Integration tests for airsync-client
//!
//! Uses wiremock to stand in for the sync server and verifies the HTTP
//! exchange pipeline, the `Sync` merge loop and the polling helpers
//! end to end.

mod common;

mod test_exchange;
mod test_polling;
mod test_resync;
