//! HTTP exchange pipeline
//!
//! [`AirSyncClient`] turns a [`RawRequest`] into one HTTP round trip:
//!
//! 1. Frame the body: legacy mail sends carry raw MIME, `Sync` and
//!    `ItemOperations` drop elements the server rejects, everything else is
//!    encoded unchanged through the [`BodyCodec`]
//! 2. Build the URL with the query encoder and attach Basic credentials
//!    (plus the protocol headers when the query is plain text)
//! 3. Read the body (chunk by chunk for chunked transfers) and decode it
//!    according to the response `Content-Type`
//!
//! The client keeps no per-call state: the request and response XML of an
//! exchange come back inside the [`RawResponse`]. Changing the query mode or
//! the policy key takes `&mut self`, so it cannot happen while an exchange
//! is in flight.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use airsync_client::client::AirSyncClient;
//! use airsync_core::codec::BodyCodec;
//! use airsync_core::config::ConfigBuilder;
//! use airsync_core::domain::Credentials;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ConfigBuilder::new()
//!     .server_host("mail.example.com")
//!     .device_user("alice")
//!     .build();
//! let client = AirSyncClient::new(&config, Credentials::new("alice", "secret"), BodyCodec::text_only())?;
//! let options = client.send_options().await?;
//! println!("{:?}", options.header("MS-ASProtocolVersions"));
//! # Ok(())
//! # }
//! ```

use airsync_core::codec::{BodyCodec, RFC822_CONTENT_TYPE, XML_CONTENT_TYPE};
use airsync_core::config::Config;
use airsync_core::domain::autodiscover::{self, AutodiscoverOutcome};
use airsync_core::domain::{
    AirSyncError, AirSyncResult, Credentials, DeviceIdentity, ExchangeSnapshot, HttpMethod,
    ProtocolVersion, RawRequest, RawResponse, ServerCapabilities,
};
use airsync_core::ports::IExchange;
use airsync_core::query::{encode_query, EncodedQuery, QueryMode};
use airsync_core::xml::{extract_mime, strip_elements};
use reqwest::header::{CONTENT_TYPE, TRANSFER_ENCODING};
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::{debug, info, warn};
use url::Url;

/// Longest error body echoed into a transport error message
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Request body after command-specific framing
struct FramedBody {
    /// XML handed to the encoder (or the MIME source for raw sends)
    xml: String,
    bytes: Vec<u8>,
    content_type: String,
}

/// HTTP client for one account and device
pub struct AirSyncClient {
    /// The underlying HTTP client
    http: Client,
    /// Scheme, host and port, e.g. `https://mail.example.com`
    base_url: String,
    /// Path of the sync endpoint
    path: String,
    /// Path of the autodiscover endpoint
    autodiscover_path: String,
    credentials: Credentials,
    identity: DeviceIdentity,
    version: ProtocolVersion,
    query_mode: QueryMode,
    accept_language: String,
    accept_multipart: bool,
    codec: BodyCodec,
}

impl AirSyncClient {
    /// Creates a client from a validated configuration
    ///
    /// # Errors
    /// [`AirSyncError::Configuration`] when the protocol version, query mode
    /// or device identity in `config` is unusable.
    pub fn new(config: &Config, credentials: Credentials, codec: BodyCodec) -> AirSyncResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .gzip(config.transport.gzip)
            .user_agent(config.transport.user_agent.clone())
            .build()
            .map_err(|e| AirSyncError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            path: config.server.path.clone(),
            autodiscover_path: config.server.autodiscover_path.clone(),
            credentials,
            identity: config.device_identity()?,
            version: config.protocol_version()?,
            query_mode: config.query_mode()?,
            accept_language: config.device.accept_language.clone(),
            accept_multipart: config.transport.accept_multipart,
            codec: codec.with_photo_redaction(config.transport.redact_photos),
        })
    }

    /// Points the client at a different server root (useful for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Stores the policy key returned by Provision; `None` clears it
    pub fn set_policy_key(&mut self, policy_key: Option<String>) {
        self.identity.policy_key = policy_key;
        debug!(has_key = self.identity.policy_key.is_some(), "Updated policy key");
    }

    /// Switches between plain and base64 queries for subsequent requests
    pub fn set_query_mode(&mut self, mode: QueryMode) {
        self.query_mode = mode;
        debug!(mode = %mode, "Updated query mode");
    }

    pub fn query_mode(&self) -> QueryMode {
        self.query_mode
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL and query mode for `request`
    pub fn build_url(&self, request: &RawRequest) -> AirSyncResult<(Url, QueryMode)> {
        let EncodedQuery { mode, query } = encode_query(
            request.command,
            self.version,
            &self.identity,
            &request.parameters,
            self.query_mode,
        )?;

        let mut url = self.endpoint(&self.base_url, &self.path)?;
        url.set_query(Some(&query));
        Ok((url, mode))
    }

    fn endpoint(&self, base: &str, path: &str) -> AirSyncResult<Url> {
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| AirSyncError::Configuration(format!("invalid server URL '{base}{path}': {e}")))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(self.credentials.login(), Some(&self.credentials.password))
    }

    /// Adds the headers that replace the binary query fields
    fn protocol_headers(&self, mut builder: RequestBuilder) -> RequestBuilder {
        builder = builder
            .header("MS-ASProtocolVersion", self.version.as_str())
            .header("Accept-Language", self.accept_language.as_str());

        if let Some(key) = self.identity.policy_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.header("X-MS-PolicyKey", key);
        }
        if self.accept_multipart {
            builder = builder.header("MS-ASAcceptMultiPart", "T");
        }
        builder
    }

    fn frame_body(&self, request: &RawRequest) -> AirSyncResult<FramedBody> {
        if request.command.is_mail_send_family() && self.version.sends_raw_mime() {
            let mime = extract_mime(&request.body)?.ok_or_else(|| AirSyncError::InvalidParameter {
                name: "Mime".to_string(),
                reason: format!("{} request has no MIME content", request.command),
            })?;
            return Ok(FramedBody {
                xml: request.body.clone(),
                bytes: mime.into_bytes(),
                content_type: RFC822_CONTENT_TYPE.to_string(),
            });
        }

        let xml = strip_elements(&request.body, request.command.stripped_elements())?;
        let bytes = self.codec.to_wire(&xml, &request.content_type)?;
        Ok(FramedBody {
            xml,
            bytes,
            content_type: request.content_type.clone(),
        })
    }

    /// Sends one command request and decodes the response
    ///
    /// # Errors
    /// - [`AirSyncError::CodecUnavailable`] when the body needs WBXML and no
    ///   codec is installed
    /// - [`AirSyncError::Transport`] on connection failure or a non-2xx status
    pub async fn send(&self, request: &RawRequest) -> AirSyncResult<RawResponse> {
        let framed = self.frame_body(request)?;
        let (url, mode) = self.build_url(request)?;

        debug!(
            command = %request.command,
            mode = %mode,
            content_type = %framed.content_type,
            bytes = framed.bytes.len(),
            "Sending request"
        );

        let method = match request.method {
            HttpMethod::Post => Method::POST,
            HttpMethod::Options => Method::OPTIONS,
        };
        let mut builder = self.authorized(self.http.request(method, url));
        if mode == QueryMode::PlainText {
            builder = self.protocol_headers(builder);
        }
        if !framed.bytes.is_empty() {
            builder = builder
                .header(CONTENT_TYPE, framed.content_type.as_str())
                .body(framed.bytes);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AirSyncError::connection(e.to_string()))?;

        self.finish_exchange(response, framed.xml, &request.content_type)
            .await
    }

    /// Issues `OPTIONS` against the sync endpoint
    ///
    /// The interesting part of the answer is in the headers; see
    /// [`AirSyncClient::capabilities`].
    pub async fn send_options(&self) -> AirSyncResult<RawResponse> {
        let url = self.endpoint(&self.base_url, &self.path)?;
        debug!(url = %url, "Sending OPTIONS");

        let response = self
            .authorized(self.http.request(Method::OPTIONS, url))
            .send()
            .await
            .map_err(|e| AirSyncError::connection(e.to_string()))?;

        self.finish_exchange(response, String::new(), XML_CONTENT_TYPE)
            .await
    }

    /// Protocol versions and commands advertised by the server
    pub async fn capabilities(&self) -> AirSyncResult<ServerCapabilities> {
        let response = self.send_options().await?;
        let caps = ServerCapabilities::from_response(&response);
        info!(
            versions = caps.versions.len(),
            commands = caps.commands.len(),
            "Server capabilities discovered"
        );
        Ok(caps)
    }

    /// Posts an autodiscover document to `host`
    ///
    /// `host` may carry a scheme (`http://host:8080`); otherwise the
    /// configured scheme of the sync endpoint is used.
    pub async fn send_autodiscover(&self, request_xml: &str, host: &str) -> AirSyncResult<RawResponse> {
        let base = if host.contains("://") {
            host.trim_end_matches('/').to_string()
        } else {
            let scheme = self.base_url.split("://").next().unwrap_or("https");
            format!("{scheme}://{}", host.trim_end_matches('/'))
        };
        let url = self.endpoint(&base, &self.autodiscover_path)?;
        let content_type = format!("{XML_CONTENT_TYPE}; charset=utf-8");
        let bytes = self.codec.to_wire(request_xml, &content_type)?;

        debug!(url = %url, bytes = bytes.len(), "Sending autodiscover request");

        let response = self
            .authorized(self.http.post(url))
            .header(CONTENT_TYPE, content_type.as_str())
            .body(bytes)
            .send()
            .await
            .map_err(|e| AirSyncError::connection(e.to_string()))?;

        self.finish_exchange(response, request_xml.to_string(), &content_type)
            .await
    }

    /// Runs autodiscover for `email` against `host`
    pub async fn autodiscover(&self, email: &str, host: &str) -> AirSyncResult<AutodiscoverOutcome> {
        let response = self
            .send_autodiscover(&autodiscover::request_xml(email), host)
            .await?;
        autodiscover::parse_response(&response.xml)
    }

    /// Reads and decodes the response, turning non-2xx into an error
    async fn finish_exchange(
        &self,
        response: Response,
        request_xml: String,
        fallback_content_type: &str,
    ) -> AirSyncResult<RawResponse> {
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        let raw = read_body(response).await?;

        debug!(
            status = status.as_u16(),
            bytes = raw.len(),
            "Received response"
        );

        if !status.is_success() {
            let body = String::from_utf8_lossy(&raw);
            let body: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
            warn!(status = status.as_u16(), "Server returned an error status");
            let message = if body.is_empty() {
                status_text
            } else {
                format!("{status_text}: {body}")
            };
            return Err(AirSyncError::http_status(status.as_u16(), message));
        }

        let content_type = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| fallback_content_type.to_string());
        let decoded = self.codec.from_wire(&raw, &content_type)?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text,
            headers,
            raw,
            snapshot: ExchangeSnapshot {
                request_xml,
                response_xml: decoded.xml.clone(),
            },
            xml: decoded.xml,
            parts: decoded.parts,
        })
    }
}

/// Reads the whole body
///
/// Chunked transfers are consumed frame by frame until end of stream;
/// chunk-size framing is removed by the HTTP layer. Bodies with a declared
/// length are read in one go, and a body shorter than declared is an error.
async fn read_body(mut response: Response) -> AirSyncResult<Vec<u8>> {
    let chunked = response
        .headers()
        .get(TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));

    if !chunked {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AirSyncError::connection(format!("failed to read body: {e}")))?;
        return Ok(bytes.to_vec());
    }

    let mut body = Vec::new();
    let mut frames = 0usize;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AirSyncError::connection(format!("failed to read chunk: {e}")))?
    {
        frames += 1;
        body.extend_from_slice(&chunk);
    }
    debug!(frames, bytes = body.len(), "Read chunked body");
    Ok(body)
}

#[async_trait::async_trait]
impl IExchange for AirSyncClient {
    async fn send(&self, request: &RawRequest) -> AirSyncResult<RawResponse> {
        AirSyncClient::send(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use airsync_core::config::ConfigBuilder;
    use airsync_core::domain::{Command, ParameterName};

    use super::*;

    fn client(mode: &str, version: &str) -> AirSyncClient {
        let config = ConfigBuilder::new()
            .server_host("mail.example.com")
            .device_user("alice")
            .device_id("DEV01")
            .device_type("Phone")
            .device_protocol_version(version)
            .transport_query_mode(mode)
            .build();
        AirSyncClient::new(&config, Credentials::new("alice", "pw"), BodyCodec::text_only()).unwrap()
    }

    #[test]
    fn test_build_url_plain() {
        let client = client("plain", "14.1");
        let request = RawRequest::new(Command::ItemOperations, "<ItemOperations/>")
            .with_parameter(ParameterName::CollectionId, "5")
            .with_parameter(ParameterName::ItemId, "9");

        let (url, mode) = client.build_url(&request).unwrap();
        assert_eq!(mode, QueryMode::PlainText);
        assert_eq!(
            url.as_str(),
            "https://mail.example.com/Microsoft-Server-ActiveSync?Cmd=ItemOperations&User=alice&DeviceId=DEV01&DeviceType=Phone&CollectionId=5&ItemId=9"
        );
    }

    #[test]
    fn test_build_url_folder_sync_is_plain_in_base64_mode() {
        let client = client("base64", "14.1");
        let (_, mode) = client
            .build_url(&RawRequest::new(Command::FolderSync, ""))
            .unwrap();
        assert_eq!(mode, QueryMode::PlainText);

        let (url, mode) = client
            .build_url(&RawRequest::new(Command::Sync, ""))
            .unwrap();
        assert_eq!(mode, QueryMode::Base64);
        assert!(!url.query().unwrap_or_default().contains("Cmd="));
    }

    #[test]
    fn test_legacy_send_mail_uses_raw_mime() {
        let client = client("plain", "12.1");
        let request = RawRequest::new(
            Command::SendMail,
            "<SendMail><ClientId>1</ClientId><Mime><![CDATA[Subject: x\r\n\r\nhi]]></Mime></SendMail>",
        );
        let framed = client.frame_body(&request).unwrap();
        assert_eq!(framed.content_type, RFC822_CONTENT_TYPE);
        assert_eq!(framed.bytes, b"Subject: x\r\n\r\nhi".to_vec());
    }

    #[test]
    fn test_modern_send_mail_needs_codec() {
        let client = client("plain", "14.1");
        let request = RawRequest::new(Command::SendMail, "<SendMail><Mime>x</Mime></SendMail>");
        let err = client.frame_body(&request).err().unwrap();
        assert!(matches!(err, AirSyncError::CodecUnavailable(_)));
    }

    #[test]
    fn test_sync_strips_supported() {
        let client = client("plain", "14.1");
        let request = RawRequest::new(
            Command::Sync,
            "<Sync><Collection><Supported><Body/></Supported><SyncKey>0</SyncKey></Collection></Sync>",
        )
        .with_content_type(XML_CONTENT_TYPE);
        let framed = client.frame_body(&request).unwrap();
        assert_eq!(framed.xml, "<Sync><Collection><SyncKey>0</SyncKey></Collection></Sync>");
    }

    #[test]
    fn test_setters() {
        let mut client = client("plain", "14.1");
        client.set_query_mode(QueryMode::Base64);
        client.set_policy_key(Some("123".into()));
        assert_eq!(client.query_mode(), QueryMode::Base64);
        assert_eq!(client.identity().numeric_policy_key(), Some(123));
    }
}
