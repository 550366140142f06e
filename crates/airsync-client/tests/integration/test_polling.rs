//! Integration tests for the polling helpers against a mock server

use std::time::Duration;

use airsync_client::poll::{wait_for_count, wait_for_none, wait_for_text, PollPolicy};
use airsync_core::domain::{AirSyncError, Command, RawRequest};
use wiremock::matchers::{method, query_param};
use wiremock::Mock;

use crate::common;

fn policy(attempts: u32) -> PollPolicy {
    PollPolicy::new(attempts, Duration::from_millis(10))
}

fn item_estimate() -> RawRequest {
    RawRequest::new(Command::GetItemEstimate, "<GetItemEstimate/>")
}

#[tokio::test]
async fn test_wait_for_count_retries_until_match() {
    let (server, client) = common::setup_airsync_mock().await;

    // first two answers are stale, the third has both items
    Mock::given(method("POST"))
        .and(query_param("Cmd", "GetItemEstimate"))
        .respond_with(common::wbxml_response("<Items><Item>a</Item></Items>"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("Cmd", "GetItemEstimate"))
        .respond_with(common::wbxml_response(
            "<Items><Item>a</Item><Item>b</Item></Items>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let response = wait_for_count(&client, &item_estimate(), &policy(5), "Item", 2)
        .await
        .expect("condition never met");
    assert!(response.xml.contains("<Item>b</Item>"));
}

#[tokio::test]
async fn test_wait_for_text_times_out() {
    let (server, client) = common::setup_airsync_mock().await;

    Mock::given(method("POST"))
        .respond_with(common::wbxml_response("<Items/>"))
        .expect(3)
        .mount(&server)
        .await;

    let err = wait_for_text(&client, &item_estimate(), &policy(3), "never")
        .await
        .unwrap_err();
    assert_eq!(err, AirSyncError::PollTimeout { attempts: 3 });
}

#[tokio::test]
async fn test_wait_for_none_accepts_first_clean_response() {
    let (server, client) = common::setup_airsync_mock().await;

    Mock::given(method("POST"))
        .respond_with(common::wbxml_response("<Items/>"))
        .expect(1)
        .mount(&server)
        .await;

    wait_for_none(&client, &item_estimate(), &policy(3), "<Item>")
        .await
        .expect("first response has no items");
}

#[tokio::test]
async fn test_transport_error_stops_polling() {
    let (server, client) = common::setup_airsync_mock().await;

    Mock::given(method("POST"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = wait_for_text(&client, &item_estimate(), &policy(5), "x")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}
