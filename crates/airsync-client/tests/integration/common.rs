//! Shared helpers for the integration tests
//!
//! The mock server speaks XML directly: [`PassthroughCodec`] stands in for
//! the WBXML engine, so "binary" bodies are just the UTF-8 bytes of the
//! document.

use std::sync::Arc;

use airsync_client::AirSyncClient;
use airsync_core::codec::{BodyCodec, WBXML_CONTENT_TYPE};
use airsync_core::config::{Config, ConfigBuilder};
use airsync_core::domain::{AirSyncError, AirSyncResult, Credentials};
use airsync_core::ports::IWbxmlCodec;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::{MockServer, ResponseTemplate};

pub const USER: &str = "alice";
pub const PASSWORD: &str = "s3cret";
pub const ENDPOINT: &str = "/Microsoft-Server-ActiveSync";

/// WBXML stand-in that passes UTF-8 text through unchanged
pub struct PassthroughCodec;

impl IWbxmlCodec for PassthroughCodec {
    fn encode(&self, xml: &str) -> AirSyncResult<Vec<u8>> {
        Ok(xml.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> AirSyncResult<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| AirSyncError::Codec(e.to_string()))
    }
}

/// Configuration shared by every test client
pub fn base_config() -> ConfigBuilder {
    ConfigBuilder::new()
        .server_host("mail.example.com")
        .device_user(USER)
        .device_id("DEV01")
        .device_type("Phone")
        .device_protocol_version("14.1")
}

/// Builds a client for `config` pointed at `server`
pub fn client_for(server: &MockServer, config: &Config) -> AirSyncClient {
    client_at(&server.uri(), config)
}

/// Builds a client for `config` pointed at `base_url`
pub fn client_at(base_url: &str, config: &Config) -> AirSyncClient {
    AirSyncClient::new(
        config,
        Credentials::new(USER, PASSWORD),
        BodyCodec::new(Arc::new(PassthroughCodec)),
    )
    .expect("client config is valid")
    .with_base_url(base_url)
}

/// Accepts one connection, reads the request and writes `reply` verbatim
///
/// For replies wiremock cannot produce: chunked framing, truncated bodies.
/// The socket is closed after the write. Returns the base URL.
pub async fn serve_raw_once(reply: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept connection");
        read_request(&mut socket).await;
        socket.write_all(&reply).await.expect("write reply");
        socket.flush().await.expect("flush reply");
    });

    format!("http://{addr}")
}

/// Reads request headers plus a `Content-Length` body
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.expect("read request");
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let length: usize = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.expect("read request body");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Starts a mock server and returns a client with the default test config
pub async fn setup_airsync_mock() -> (MockServer, AirSyncClient) {
    let server = MockServer::start().await;
    let client = client_for(&server, &base_config().build());
    (server, client)
}

/// 200 response carrying `xml` as a "WBXML" body
pub fn wbxml_response(xml: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(xml.as_bytes().to_vec(), WBXML_CONTENT_TYPE)
}

/// One `Sync` round for collection 5
pub fn sync_round(key: &str, status: &str, server_ids: &[&str], more: bool) -> String {
    let adds: String = server_ids
        .iter()
        .map(|id| format!("<Add><ServerId>{id}</ServerId><ApplicationData/></Add>"))
        .collect();
    format!(
        "<Sync><Collections><Collection><SyncKey>{key}</SyncKey><CollectionId>5</CollectionId>\
         <Status>{status}</Status>{}<Commands>{adds}</Commands></Collection></Collections></Sync>",
        if more { "<MoreAvailable/>" } else { "" }
    )
}

/// Initial `Sync` request body with sync key `key`
pub fn sync_request(key: &str) -> String {
    format!(
        "<Sync><Collections><Collection><SyncKey>{key}</SyncKey><CollectionId>5</CollectionId>\
         <Supported><Body/></Supported></Collection></Collections></Sync>"
    )
}
