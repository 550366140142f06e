//! Body codec dispatcher
//!
//! Picks the wire form of a body from its content type:
//!
//! | Content type | Encode | Decode |
//! |---|---|---|
//! | `*/*wbxml` | WBXML codec | WBXML codec |
//! | `*/*multipart` | - | envelope header, first part through the WBXML codec |
//! | anything else | charset text | charset text |

use std::sync::Arc;

use tracing::debug;

use crate::charset::Charset;
use crate::domain::errors::{AirSyncError, AirSyncResult};
use crate::multipart::MultipartMetadata;
use crate::ports::wbxml::IWbxmlCodec;
use crate::xml::redact_binary_payloads;

pub const WBXML_CONTENT_TYPE: &str = "application/vnd.ms-sync.wbxml";
pub const MULTIPART_CONTENT_TYPE: &str = "application/vnd.ms-sync.multipart";
pub const RFC822_CONTENT_TYPE: &str = "message/rfc822";
pub const XML_CONTENT_TYPE: &str = "text/xml";

/// Body family derived from a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Wbxml,
    Multipart,
    Text(Charset),
}

impl ContentKind {
    /// Classifies a `Content-Type` value by the suffix of its media type
    pub fn classify(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence.ends_with("wbxml") {
            ContentKind::Wbxml
        } else if essence.ends_with("multipart") {
            ContentKind::Multipart
        } else {
            ContentKind::Text(Charset::from_content_type(content_type))
        }
    }
}

/// Decoded response body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBody {
    pub xml: String,
    /// Multipart parts after the first, left undecoded
    pub parts: Vec<Vec<u8>>,
}

/// Converts XML bodies to and from their wire form
#[derive(Clone)]
pub struct BodyCodec {
    wbxml: Option<Arc<dyn IWbxmlCodec>>,
    redact_photos: bool,
}

impl BodyCodec {
    /// Codec with WBXML support
    pub fn new(wbxml: Arc<dyn IWbxmlCodec>) -> Self {
        Self {
            wbxml: Some(wbxml),
            redact_photos: true,
        }
    }

    /// Codec for text bodies only; any WBXML content type fails
    pub fn text_only() -> Self {
        Self {
            wbxml: None,
            redact_photos: true,
        }
    }

    pub fn with_photo_redaction(mut self, enabled: bool) -> Self {
        self.redact_photos = enabled;
        self
    }

    pub fn has_wbxml(&self) -> bool {
        self.wbxml.is_some()
    }

    fn wbxml(&self, content_type: &str) -> AirSyncResult<&dyn IWbxmlCodec> {
        self.wbxml
            .as_deref()
            .ok_or_else(|| AirSyncError::CodecUnavailable(content_type.to_string()))
    }

    /// Encodes an outgoing XML body for `content_type`
    pub fn to_wire(&self, xml: &str, content_type: &str) -> AirSyncResult<Vec<u8>> {
        if xml.is_empty() {
            return Ok(Vec::new());
        }

        match ContentKind::classify(content_type) {
            ContentKind::Wbxml | ContentKind::Multipart => self.wbxml(content_type)?.encode(xml),
            ContentKind::Text(charset) => Ok(charset.encode(xml)),
        }
    }

    /// Decodes an incoming body according to its `content_type`
    pub fn from_wire(&self, bytes: &[u8], content_type: &str) -> AirSyncResult<DecodedBody> {
        if bytes.is_empty() {
            return Ok(DecodedBody::default());
        }

        let decoded = match ContentKind::classify(content_type) {
            ContentKind::Wbxml => DecodedBody {
                xml: self.wbxml(content_type)?.decode(bytes)?,
                parts: Vec::new(),
            },
            ContentKind::Multipart => self.decode_multipart(bytes, content_type)?,
            ContentKind::Text(charset) => DecodedBody {
                xml: charset.decode(bytes)?,
                parts: Vec::new(),
            },
        };

        if self.redact_photos {
            Ok(DecodedBody {
                xml: redact_binary_payloads(&decoded.xml)?,
                ..decoded
            })
        } else {
            Ok(decoded)
        }
    }

    fn decode_multipart(&self, bytes: &[u8], content_type: &str) -> AirSyncResult<DecodedBody> {
        let codec = self.wbxml(content_type)?;
        let meta = MultipartMetadata::parse(bytes).ok_or_else(|| {
            AirSyncError::InvalidResponse(format!(
                "multipart envelope header is malformed ({} bytes)",
                bytes.len()
            ))
        })?;

        debug!(parts = meta.part_count(), total = bytes.len(), "Decoding multipart body");

        let first = meta
            .part(bytes, 0)
            .ok_or_else(|| AirSyncError::InvalidResponse("multipart part 0 is out of range".into()))?;

        let parts = (1..meta.part_count())
            .map(|i| {
                meta.part(bytes, i).map(<[u8]>::to_vec).ok_or_else(|| {
                    AirSyncError::InvalidResponse(format!("multipart part {i} is out of range"))
                })
            })
            .collect::<AirSyncResult<Vec<_>>>()?;

        Ok(DecodedBody {
            xml: codec.decode(first)?,
            parts,
        })
    }
}

impl std::fmt::Debug for BodyCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyCodec")
            .field("wbxml", &self.wbxml.is_some())
            .field("redact_photos", &self.redact_photos)
            .finish()
    }
}
