//! WBXML codec port
//!
//! The binary tokenizer is supplied from outside. The body codec treats it
//! as an opaque dependency that may fail; a missing codec is reported as
//! [`AirSyncError::CodecUnavailable`](crate::domain::AirSyncError) by the
//! caller, never by the codec itself.

use crate::domain::errors::AirSyncResult;

/// Converts between XML text and its WBXML form
pub trait IWbxmlCodec: Send + Sync {
    /// Tokenizes an XML document
    fn encode(&self, xml: &str) -> AirSyncResult<Vec<u8>>;

    /// Expands a WBXML document back to XML text
    fn decode(&self, bytes: &[u8]) -> AirSyncResult<String>;
}
