//! Protocol versions

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::AirSyncError;

/// Protocol version negotiated with the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProtocolVersion {
    V12_0,
    V12_1,
    V14_0,
    V14_1,
    V16_0,
    V16_1,
}

impl ProtocolVersion {
    /// Value of the `MS-ASProtocolVersion` header
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProtocolVersion::V12_0 => "12.0",
            ProtocolVersion::V12_1 => "12.1",
            ProtocolVersion::V14_0 => "14.0",
            ProtocolVersion::V14_1 => "14.1",
            ProtocolVersion::V16_0 => "16.0",
            ProtocolVersion::V16_1 => "16.1",
        }
    }

    /// Version byte of the base64 query (major * 10 + minor)
    pub const fn as_byte(&self) -> u8 {
        match self {
            ProtocolVersion::V12_0 => 120,
            ProtocolVersion::V12_1 => 121,
            ProtocolVersion::V14_0 => 140,
            ProtocolVersion::V14_1 => 141,
            ProtocolVersion::V16_0 => 160,
            ProtocolVersion::V16_1 => 161,
        }
    }

    /// Versions before 14.0 send mail as a raw RFC 822 body.
    pub fn sends_raw_mime(&self) -> bool {
        *self < ProtocolVersion::V14_0
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        ProtocolVersion::V14_1
    }
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = AirSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "12.0" => Ok(ProtocolVersion::V12_0),
            "12.1" => Ok(ProtocolVersion::V12_1),
            "14.0" => Ok(ProtocolVersion::V14_0),
            "14.1" => Ok(ProtocolVersion::V14_1),
            "16.0" => Ok(ProtocolVersion::V16_0),
            "16.1" => Ok(ProtocolVersion::V16_1),
            other => Err(AirSyncError::Configuration(format!(
                "unsupported protocol version '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = AirSyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProtocolVersion> for String {
    fn from(value: ProtocolVersion) -> Self {
        value.as_str().to_string()
    }
}
