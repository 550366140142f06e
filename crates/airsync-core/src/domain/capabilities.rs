//! Server capabilities advertised by an OPTIONS response

use serde::{Deserialize, Serialize};

use super::response::RawResponse;
use super::version::ProtocolVersion;

/// Protocol versions and commands the server supports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Raw `MS-ASProtocolVersions` entries, in server order
    pub versions: Vec<String>,
    /// `MS-ASProtocolCommands` entries, in server order
    pub commands: Vec<String>,
}

impl ServerCapabilities {
    pub fn from_response(response: &RawResponse) -> Self {
        Self {
            versions: split_list(response.header("MS-ASProtocolVersions")),
            commands: split_list(response.header("MS-ASProtocolCommands")),
        }
    }

    /// Highest advertised version this client also speaks
    pub fn best_version(&self) -> Option<ProtocolVersion> {
        self.versions
            .iter()
            .filter_map(|v| v.parse::<ProtocolVersion>().ok())
            .max()
    }

    pub fn supports_command(&self, name: &str) -> bool {
        self.commands.iter().any(|c| c.eq_ignore_ascii_case(name))
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
