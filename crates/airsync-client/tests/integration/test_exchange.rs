//! Integration tests for the HTTP exchange pipeline
//!
//! - Plain and base64 query forms, protocol headers and credentials
//! - Error statuses and connection failures
//! - OPTIONS capability discovery and autodiscover
//! - Multipart and charset-encoded responses
//! - Chunked and truncated response bodies

use airsync_client::AirSyncClient;
use airsync_core::charset::Charset;
use airsync_core::codec::{BodyCodec, MULTIPART_CONTENT_TYPE, WBXML_CONTENT_TYPE};
use airsync_core::domain::{
    AirSyncError, AutodiscoverOutcome, Command, Credentials, ParameterName, ProtocolVersion,
    RawRequest, SyncRound,
};
use airsync_core::query::QueryMode;
use wiremock::matchers::{
    basic_auth, body_string, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_plain_request_carries_query_headers_and_credentials() {
    let (server, client) = common::setup_airsync_mock().await;

    Mock::given(method("POST"))
        .and(path(common::ENDPOINT))
        .and(query_param("Cmd", "FolderSync"))
        .and(query_param("User", common::USER))
        .and(query_param("DeviceId", "DEV01"))
        .and(query_param("DeviceType", "Phone"))
        .and(header("MS-ASProtocolVersion", "14.1"))
        .and(header("Accept-Language", "en-us"))
        .and(header("Content-Type", WBXML_CONTENT_TYPE))
        .and(basic_auth(common::USER, common::PASSWORD))
        .and(body_string("<FolderSync><SyncKey>0</SyncKey></FolderSync>"))
        .respond_with(common::wbxml_response(
            "<FolderSync><Status>1</Status><SyncKey>1</SyncKey></FolderSync>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let request = RawRequest::new(
        Command::FolderSync,
        "<FolderSync><SyncKey>0</SyncKey></FolderSync>",
    );
    let response = client.send(&request).await.expect("FolderSync failed");

    assert_eq!(response.status, 200);
    assert_eq!(
        response.xml,
        "<FolderSync><Status>1</Status><SyncKey>1</SyncKey></FolderSync>"
    );
    assert_eq!(response.snapshot.request_xml, request.body);
    assert_eq!(response.snapshot.response_xml, response.xml);
    assert_eq!(response.content_type(), Some(WBXML_CONTENT_TYPE));
}

#[tokio::test]
async fn test_legacy_send_mail_posts_raw_mime() {
    let server = MockServer::start().await;
    let config = common::base_config().device_protocol_version("12.1").build();
    let client = common::client_for(&server, &config);

    Mock::given(method("POST"))
        .and(path(common::ENDPOINT))
        .and(query_param("Cmd", "SendMail"))
        .and(header("MS-ASProtocolVersion", "12.1"))
        .and(header("Content-Type", "message/rfc822"))
        .and(body_string("Subject: hi\r\n\r\nbody"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let request = RawRequest::new(
        Command::SendMail,
        "<SendMail><ClientId>1</ClientId><Mime><![CDATA[Subject: hi\r\n\r\nbody]]></Mime></SendMail>",
    );
    let response = client.send(&request).await.expect("SendMail failed");

    assert_eq!(response.status, 200);
    assert_eq!(response.snapshot.request_xml, request.body);
}

#[tokio::test]
async fn test_policy_key_and_multipart_headers() {
    let server = MockServer::start().await;
    let config = common::base_config()
        .device_policy_key("3942919513")
        .transport_accept_multipart(true)
        .build();
    let client = common::client_for(&server, &config);

    Mock::given(method("POST"))
        .and(path(common::ENDPOINT))
        .and(header("X-MS-PolicyKey", "3942919513"))
        .and(header("MS-ASAcceptMultiPart", "T"))
        .respond_with(common::wbxml_response("<Ping><Status>1</Status></Ping>"))
        .expect(1)
        .mount(&server)
        .await;

    let response = client
        .send(&RawRequest::new(Command::Ping, "<Ping/>"))
        .await
        .expect("Ping failed");
    assert_eq!(response.xml, "<Ping><Status>1</Status></Ping>");
}

#[tokio::test]
async fn test_base64_query_omits_protocol_headers() {
    let (server, mut client) = common::setup_airsync_mock().await;
    client.set_query_mode(QueryMode::Base64);

    Mock::given(method("POST"))
        .and(path(common::ENDPOINT))
        .respond_with(common::wbxml_response("<Sync/>"))
        .expect(1)
        .mount(&server)
        .await;

    let request = RawRequest::new(Command::Sync, common::sync_request("1"))
        .with_parameter(ParameterName::CollectionId, "5");
    client.send(&request).await.expect("Sync failed");

    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 1);
    let query = received[0].url.query().unwrap_or_default();
    assert!(!query.is_empty());
    assert!(!query.contains("Cmd="));
    assert!(received[0].headers.get("MS-ASProtocolVersion").is_none());
    assert!(received[0].headers.get("Accept-Language").is_none());

    // Supported is dropped from Sync bodies before encoding
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(!body.contains("Supported"));
    assert!(body.contains("<SyncKey>1</SyncKey>"));
}

#[tokio::test]
async fn test_folder_sync_stays_plain_in_base64_mode() {
    let (server, mut client) = common::setup_airsync_mock().await;
    client.set_query_mode(QueryMode::Base64);

    Mock::given(method("POST"))
        .and(query_param("Cmd", "FolderSync"))
        .and(header("MS-ASProtocolVersion", "14.1"))
        .respond_with(common::wbxml_response("<FolderSync/>"))
        .expect(1)
        .mount(&server)
        .await;

    client
        .send(&RawRequest::new(Command::FolderSync, "<FolderSync/>"))
        .await
        .expect("FolderSync failed");
    assert_eq!(client.query_mode(), QueryMode::Base64);
}

#[tokio::test]
async fn test_error_status_is_preserved() {
    let (server, client) = common::setup_airsync_mock().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(449).set_body_string("Provision required"))
        .mount(&server)
        .await;

    let err = client
        .send(&RawRequest::new(Command::Sync, "<Sync/>"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(449));
    assert!(err.to_string().contains("Provision required"));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_unauthorized_status() {
    let (server, client) = common::setup_airsync_mock().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client
        .send(&RawRequest::new(Command::FolderSync, "<FolderSync/>"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AirSyncError::Transport {
            status: Some(401),
            ..
        }
    ));
}

#[tokio::test]
async fn test_connection_failure_has_no_status() {
    let config = common::base_config().transport_timeout_secs(2).build();
    let client = AirSyncClient::new(
        &config,
        Credentials::new(common::USER, common::PASSWORD),
        BodyCodec::text_only(),
    )
    .unwrap()
    .with_base_url("http://127.0.0.1:1");

    let err = client.send_options().await.unwrap_err();
    assert!(matches!(err, AirSyncError::Transport { status: None, .. }));
}

#[tokio::test]
async fn test_options_reports_capabilities() {
    let (server, client) = common::setup_airsync_mock().await;

    Mock::given(method("OPTIONS"))
        .and(path(common::ENDPOINT))
        .and(basic_auth(common::USER, common::PASSWORD))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("MS-ASProtocolVersions", "2.5,12.0,12.1,14.0,14.1")
                .append_header("MS-ASProtocolCommands", "Sync,SendMail,FolderSync,Ping"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let caps = client.capabilities().await.expect("OPTIONS failed");
    assert_eq!(caps.versions.len(), 5);
    assert_eq!(caps.best_version(), Some(ProtocolVersion::V14_1));
    assert!(caps.supports_command("ping"));
    assert!(!caps.supports_command("Find"));
}

#[tokio::test]
async fn test_autodiscover_returns_sync_url() {
    let (server, client) = common::setup_airsync_mock().await;

    let settings = r#"<?xml version="1.0" encoding="utf-8"?>
<Autodiscover xmlns="http://schemas.microsoft.com/exchange/autodiscover/responseschema/2006">
  <Response xmlns="http://schemas.microsoft.com/exchange/autodiscover/mobilesync/responseschema/2006">
    <User><DisplayName>Alice</DisplayName><EMailAddress>alice@example.com</EMailAddress></User>
    <Action>
      <Settings>
        <Server><Type>MobileSync</Type><Url>https://mail.example.com/Microsoft-Server-ActiveSync</Url></Server>
      </Settings>
    </Action>
  </Response>
</Autodiscover>"#;

    Mock::given(method("POST"))
        .and(path("/autodiscover/autodiscover.xml"))
        .and(header("Content-Type", "text/xml; charset=utf-8"))
        .and(body_string_contains("<EMailAddress>alice@example.com</EMailAddress>"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(settings.as_bytes().to_vec(), "text/xml; charset=utf-8"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client
        .autodiscover("alice@example.com", &server.uri())
        .await
        .expect("autodiscover failed");

    assert_eq!(
        outcome,
        AutodiscoverOutcome::Settings {
            url: "https://mail.example.com/Microsoft-Server-ActiveSync".into(),
            display_name: Some("Alice".into()),
            email: Some("alice@example.com".into()),
        }
    );
}

#[tokio::test]
async fn test_multipart_response_splits_parts() {
    let (server, client) = common::setup_airsync_mock().await;

    let first = b"<ItemOperations><Status>1</Status></ItemOperations>".to_vec();
    let second = b"attachment payload".to_vec();
    let header_len = 4 + 2 * 8;
    let mut body = Vec::new();
    body.extend_from_slice(&2i32.to_le_bytes());
    body.extend_from_slice(&(header_len as i32).to_le_bytes());
    body.extend_from_slice(&(first.len() as i32).to_le_bytes());
    body.extend_from_slice(&((header_len + first.len()) as i32).to_le_bytes());
    body.extend_from_slice(&(second.len() as i32).to_le_bytes());
    body.extend_from_slice(&first);
    body.extend_from_slice(&second);

    Mock::given(method("POST"))
        .and(query_param("Cmd", "ItemOperations"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), MULTIPART_CONTENT_TYPE))
        .mount(&server)
        .await;

    let response = client
        .send(&RawRequest::new(
            Command::ItemOperations,
            "<ItemOperations><Fetch><Schema/></Fetch></ItemOperations>",
        ))
        .await
        .expect("ItemOperations failed");

    assert_eq!(response.xml, "<ItemOperations><Status>1</Status></ItemOperations>");
    assert_eq!(response.parts, vec![second]);
    assert_eq!(response.raw, body);

    let received = server.received_requests().await.unwrap();
    assert!(!String::from_utf8_lossy(&received[0].body).contains("Schema"));
}

#[tokio::test]
async fn test_text_response_uses_declared_charset() {
    let (server, client) = common::setup_airsync_mock().await;

    let xml = "<Settings><DisplayName>Zoë</DisplayName></Settings>";
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(Charset::Utf16.encode(xml), "text/xml; charset=utf-16"),
        )
        .mount(&server)
        .await;

    let response = client
        .send(&RawRequest::new(Command::Settings, "<Settings/>"))
        .await
        .unwrap();
    assert_eq!(response.xml, xml);
}

#[tokio::test]
async fn test_photos_are_redacted_in_responses() {
    let (server, client) = common::setup_airsync_mock().await;

    Mock::given(method("POST"))
        .respond_with(common::wbxml_response(
            "<ResolveRecipients><Picture><Data>QUJDREVGR0g=</Data></Picture></ResolveRecipients>",
        ))
        .mount(&server)
        .await;

    let response = client
        .send(&RawRequest::new(Command::ResolveRecipients, "<ResolveRecipients/>"))
        .await
        .unwrap();
    assert_eq!(
        response.xml,
        "<ResolveRecipients><Picture><Data>[12 bytes]</Data></Picture></ResolveRecipients>"
    );
    assert!(String::from_utf8_lossy(&response.raw).contains("QUJDREVGR0g="));
}

#[tokio::test]
async fn test_empty_body_decodes_to_empty_xml() {
    let (server, client) = common::setup_airsync_mock().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let response = client
        .send(&RawRequest::new(Command::Ping, "<Ping/>"))
        .await
        .unwrap();
    assert!(response.xml.is_empty());
    assert!(response.raw.is_empty());
}

#[tokio::test]
async fn test_chunked_body_is_read_to_the_end() {
    let xml = common::sync_round("9", "1", &["5:1"], false);
    let (first, rest) = xml.as_bytes().split_at(20);

    let mut reply = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {WBXML_CONTENT_TYPE}\r\nTransfer-Encoding: chunked\r\n\r\n"
    )
    .into_bytes();
    for part in [first, rest] {
        reply.extend_from_slice(format!("{:x}\r\n", part.len()).as_bytes());
        reply.extend_from_slice(part);
        reply.extend_from_slice(b"\r\n");
    }
    reply.extend_from_slice(b"0\r\n\r\n");

    let base_url = common::serve_raw_once(reply).await;
    let client = common::client_at(&base_url, &common::base_config().build());

    let response = client
        .send(&RawRequest::new(Command::Sync, common::sync_request("8")))
        .await
        .expect("Sync failed");

    assert_eq!(response.header("transfer-encoding"), Some("chunked"));
    assert_eq!(response.xml, xml);

    let round = SyncRound::parse(&response.xml).unwrap().expect("collection");
    assert_eq!(round.status.as_deref(), Some("1"));
    assert_eq!(round.sync_key.as_deref(), Some("9"));
    assert_eq!(round.changes.len(), 1);
}

#[tokio::test]
async fn test_short_body_is_a_transport_error() {
    let mut reply = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {WBXML_CONTENT_TYPE}\r\nContent-Length: 100\r\n\r\n"
    )
    .into_bytes();
    reply.extend_from_slice(b"<Sync><Col");

    let base_url = common::serve_raw_once(reply).await;
    let client = common::client_at(&base_url, &common::base_config().build());

    let err = client
        .send(&RawRequest::new(Command::Sync, common::sync_request("8")))
        .await
        .unwrap_err();
    assert!(matches!(err, AirSyncError::Transport { status: None, .. }));
}
