//! Normalized response produced by the exchange pipeline

use serde::{Deserialize, Serialize};

/// XML sent and received by a single exchange, kept for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSnapshot {
    /// Request XML after element stripping, as handed to the encoder
    pub request_xml: String,
    /// Decoded response XML
    pub response_xml: String,
}

/// Response of one exchange, owned by the caller that issued it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    /// Response headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Body bytes exactly as read from the wire
    pub raw: Vec<u8>,
    /// Decoded body
    pub xml: String,
    /// Multipart parts after the first, undecoded
    pub parts: Vec<Vec<u8>>,
    pub snapshot: ExchangeSnapshot,
}

impl RawResponse {
    /// First header value matching `name`, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
