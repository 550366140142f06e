//! Integration tests for the `Sync` merge loop against a mock server
//!
//! Each round is matched on the sync key carried in the request body, so
//! the tests also verify that the key from round k is sent in round k+1.

use std::time::Duration;

use airsync_client::resync::{sync_until_exhausted, ResyncOptions};
use airsync_core::domain::sync::SyncRound;
use airsync_core::domain::{AirSyncError, Command, RawRequest, SyncStatus};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, query_param};
use wiremock::Mock;

use crate::common;

async fn mount_round(server: &wiremock::MockServer, request_key: &str, body: String, times: u64) {
    Mock::given(method("POST"))
        .and(query_param("Cmd", "Sync"))
        .and(body_string_contains(&format!("<SyncKey>{request_key}</SyncKey>")))
        .respond_with(common::wbxml_response(&body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_merges_rounds_until_exhausted() {
    let (server, client) = common::setup_airsync_mock().await;

    mount_round(&server, "1", common::sync_round("2", "1", &["5:1", "5:2"], true), 1).await;
    mount_round(&server, "2", common::sync_round("3", "1", &["5:3"], true), 1).await;
    mount_round(&server, "3", common::sync_round("4", "1", &["5:4", "5:5"], false), 1).await;

    let request = RawRequest::new(Command::Sync, common::sync_request("1"));
    let outcome = sync_until_exhausted(
        &client,
        &request,
        &ResyncOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .expect("sync failed");

    assert!(outcome.is_completed());
    assert_eq!(outcome.rounds, 3);
    assert_eq!(outcome.changes.adds.len(), 5);
    assert_eq!(outcome.sync_key.as_deref(), Some("4"));

    let merged = SyncRound::parse(&outcome.response.xml).unwrap().unwrap();
    assert_eq!(merged.sync_key.as_deref(), Some("4"));
    assert!(!merged.more_available);
    let ids: Vec<_> = merged
        .changes
        .iter()
        .filter_map(|c| c.server_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["5:1", "5:2", "5:3", "5:4", "5:5"]);
}

#[tokio::test]
async fn test_single_round_when_nothing_more() {
    let (server, client) = common::setup_airsync_mock().await;

    mount_round(&server, "1", common::sync_round("2", "1", &["5:1"], false), 1).await;

    let outcome = sync_until_exhausted(
        &client,
        &RawRequest::new(Command::Sync, common::sync_request("1")),
        &ResyncOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.rounds, 1);
    assert_eq!(outcome.changes.len(), 1);
}

#[tokio::test]
async fn test_failed_status_ends_the_call() {
    let (server, client) = common::setup_airsync_mock().await;

    // status 3 (invalid sync key) with MoreAvailable must not be followed
    mount_round(&server, "1", common::sync_round("0", "3", &[], true), 1).await;

    let outcome = sync_until_exhausted(
        &client,
        &RawRequest::new(Command::Sync, common::sync_request("1")),
        &ResyncOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, SyncStatus::Failed("3".into()));
    assert_eq!(outcome.rounds, 1);
}

#[tokio::test]
async fn test_round_ceiling_against_endless_server() {
    let (server, client) = common::setup_airsync_mock().await;

    mount_round(&server, "1", common::sync_round("1", "1", &["5:1"], true), 3).await;

    let options = ResyncOptions {
        max_rounds: 3,
        round_delay: Duration::ZERO,
    };
    let err = sync_until_exhausted(
        &client,
        &RawRequest::new(Command::Sync, common::sync_request("1")),
        &options,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(err, AirSyncError::RoundLimitExceeded { rounds: 3 });
}

#[tokio::test]
async fn test_http_error_mid_loop_propagates() {
    let (server, client) = common::setup_airsync_mock().await;

    mount_round(&server, "1", common::sync_round("2", "1", &["5:1"], true), 1).await;
    Mock::given(method("POST"))
        .and(body_string_contains("<SyncKey>2</SyncKey>"))
        .respond_with(wiremock::ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = sync_until_exhausted(
        &client,
        &RawRequest::new(Command::Sync, common::sync_request("1")),
        &ResyncOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), Some(503));
}
