//! Request query encoding
//!
//! Each command request carries its routing data in the URL query, in one
//! of two forms:
//!
//! - **plain**: `Cmd=Sync&User=...&DeviceId=...&DeviceType=...` followed by
//!   `&Key=Value` for each command parameter
//! - **base64**: a packed binary record (version, command code, locale,
//!   device id, policy key, device type, parameters) encoded as base64 and
//!   sent as the whole query string
//!
//! The mode is chosen per client. `FolderSync` is always sent in plain form.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use url::form_urlencoded::byte_serialize;

use crate::domain::command::Command;
use crate::domain::errors::{AirSyncError, AirSyncResult};
use crate::domain::identity::DeviceIdentity;
use crate::domain::parameter::{ParameterMap, ParameterName, ParameterValue};
use crate::domain::version::ProtocolVersion;

/// How the request query is serialized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    #[serde(rename = "plain")]
    PlainText,
    Base64,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::PlainText => "plain",
            QueryMode::Base64 => "base64",
        }
    }
}

impl Display for QueryMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = AirSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "plaintext" | "text" => Ok(QueryMode::PlainText),
            "base64" | "binary" => Ok(QueryMode::Base64),
            other => Err(AirSyncError::Configuration(format!(
                "unsupported query mode '{other}' (expected 'plain' or 'base64')"
            ))),
        }
    }
}

/// Encoded query string plus the mode actually used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedQuery {
    /// Mode used; `PlainText` for `FolderSync` regardless of the request
    pub mode: QueryMode,
    /// Query string without the leading `?`
    pub query: String,
}

/// Builds the query string for one request
pub fn encode_query(
    command: Command,
    version: ProtocolVersion,
    identity: &DeviceIdentity,
    parameters: &ParameterMap,
    mode: QueryMode,
) -> AirSyncResult<EncodedQuery> {
    let mode = if command.forces_plain_query() {
        QueryMode::PlainText
    } else {
        mode
    };

    let query = match mode {
        QueryMode::PlainText => encode_plain(command, identity, parameters),
        QueryMode::Base64 => {
            let packed = pack_binary(command, version, identity, parameters)?;
            byte_serialize(STANDARD.encode(packed).as_bytes()).collect()
        }
    };

    Ok(EncodedQuery { mode, query })
}

fn encode_plain(command: Command, identity: &DeviceIdentity, parameters: &ParameterMap) -> String {
    let mut query = format!(
        "Cmd={}&User={}&DeviceId={}&DeviceType={}",
        command.name(),
        escape(&identity.user),
        escape(&identity.device_id),
        escape(&identity.device_type),
    );

    for (name, value) in parameters.iter() {
        query.push('&');
        query.push_str(name.as_str());
        query.push('=');
        query.push_str(&escape(&value.to_text()));
    }

    query
}

fn escape(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Packs the binary query record (before base64)
pub fn pack_binary(
    command: Command,
    version: ProtocolVersion,
    identity: &DeviceIdentity,
    parameters: &ParameterMap,
) -> AirSyncResult<Vec<u8>> {
    let mut out = Vec::with_capacity(32);
    out.push(version.as_byte());
    out.push(command.code());
    out.extend_from_slice(&identity.locale.to_le_bytes());
    push_prefixed(&mut out, "DeviceId", identity.device_id.as_bytes())?;

    match identity.numeric_policy_key() {
        Some(key) => {
            out.push(4);
            out.extend_from_slice(&key.to_le_bytes());
        }
        None => out.push(0),
    }

    push_prefixed(&mut out, "DeviceType", identity.device_type.as_bytes())?;

    for (name, value) in parameters.iter() {
        out.push(name.code());
        if *name == ParameterName::Options {
            out.push(1);
            out.push(options_byte(value)?);
        } else {
            push_prefixed(&mut out, name.as_str(), value.to_text().as_bytes())?;
        }
    }

    Ok(out)
}

fn push_prefixed(out: &mut Vec<u8>, name: &str, bytes: &[u8]) -> AirSyncResult<()> {
    let len = u8::try_from(bytes.len()).map_err(|_| AirSyncError::InvalidParameter {
        name: name.to_string(),
        reason: format!("{} bytes exceeds the 255-byte field limit", bytes.len()),
    })?;
    out.push(len);
    out.extend_from_slice(bytes);
    Ok(())
}

fn options_byte(value: &ParameterValue) -> AirSyncResult<u8> {
    let number = match value {
        ParameterValue::Number(n) => *n,
        ParameterValue::Text(s) => s.trim().parse::<u32>().map_err(|_| {
            AirSyncError::InvalidParameter {
                name: ParameterName::Options.as_str().to_string(),
                reason: format!("'{s}' is not a number"),
            }
        })?,
    };
    Ok((number & 0xff) as u8)
}
