//! Autodiscover request and response documents
//!
//! Autodiscover is plain XML over HTTP(S), separate from the sync endpoint.
//! The client posts a request naming the mailbox and the server answers
//! with the sync URL, a redirect to another address, or an error.

use quick_xml::de::from_str;
use quick_xml::escape::escape;
use serde::Deserialize;

use super::errors::{AirSyncError, AirSyncResult};

const REQUEST_SCHEMA: &str =
    "http://schemas.microsoft.com/exchange/autodiscover/mobilesync/requestschema/2006";
const RESPONSE_SCHEMA: &str =
    "http://schemas.microsoft.com/exchange/autodiscover/mobilesync/responseschema/2006";

/// Server type carrying the sync endpoint URL
const MOBILE_SYNC: &str = "MobileSync";

// ============================================================================
// Response document (quick-xml serde)
// ============================================================================

#[derive(Debug, Deserialize)]
struct AutodiscoverDocument {
    #[serde(rename = "Response")]
    response: Option<ResponseElement>,
}

#[derive(Debug, Deserialize)]
struct ResponseElement {
    #[serde(rename = "User")]
    user: Option<UserElement>,
    #[serde(rename = "Action")]
    action: Option<ActionElement>,
    #[serde(rename = "Error")]
    error: Option<ErrorElement>,
}

#[derive(Debug, Deserialize)]
struct UserElement {
    #[serde(rename = "DisplayName")]
    display_name: Option<String>,
    #[serde(rename = "EMailAddress")]
    email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActionElement {
    #[serde(rename = "Redirect")]
    redirect: Option<String>,
    #[serde(rename = "Settings")]
    settings: Option<SettingsElement>,
    #[serde(rename = "Error")]
    error: Option<ErrorElement>,
}

#[derive(Debug, Deserialize)]
struct SettingsElement {
    #[serde(rename = "Server", default)]
    servers: Vec<ServerElement>,
}

#[derive(Debug, Deserialize)]
struct ServerElement {
    #[serde(rename = "Type")]
    server_type: Option<String>,
    #[serde(rename = "Url")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorElement {
    #[serde(rename = "Status")]
    status: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

// ============================================================================
// Public API
// ============================================================================

/// Result of an autodiscover exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutodiscoverOutcome {
    /// The sync endpoint for the mailbox
    Settings {
        url: String,
        display_name: Option<String>,
        email: Option<String>,
    },
    /// Repeat autodiscover for another address
    Redirect(String),
    /// The server reported an error
    Error {
        status: Option<String>,
        message: Option<String>,
    },
}

/// Builds the autodiscover request document for `email`
pub fn request_xml(email: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <Autodiscover xmlns=\"{REQUEST_SCHEMA}\">\
         <Request>\
         <EMailAddress>{}</EMailAddress>\
         <AcceptableResponseSchema>{RESPONSE_SCHEMA}</AcceptableResponseSchema>\
         </Request>\
         </Autodiscover>",
        escape(email)
    )
}

/// Interprets an autodiscover response document
pub fn parse_response(xml: &str) -> AirSyncResult<AutodiscoverOutcome> {
    let document: AutodiscoverDocument = from_str(xml)
        .map_err(|e| AirSyncError::InvalidResponse(format!("autodiscover: {e}")))?;

    let response = document
        .response
        .ok_or_else(|| AirSyncError::InvalidResponse("autodiscover: no Response".into()))?;

    if let Some(error) = response.error {
        return Ok(AutodiscoverOutcome::Error {
            status: error.status,
            message: error.message,
        });
    }

    let action = response
        .action
        .ok_or_else(|| AirSyncError::InvalidResponse("autodiscover: no Action".into()))?;

    if let Some(error) = action.error {
        return Ok(AutodiscoverOutcome::Error {
            status: error.status,
            message: error.message,
        });
    }

    if let Some(redirect) = action.redirect.filter(|r| !r.trim().is_empty()) {
        return Ok(AutodiscoverOutcome::Redirect(redirect.trim().to_string()));
    }

    let url = action
        .settings
        .into_iter()
        .flat_map(|s| s.servers)
        .find(|s| s.server_type.as_deref() == Some(MOBILE_SYNC))
        .and_then(|s| s.url)
        .ok_or_else(|| {
            AirSyncError::InvalidResponse("autodiscover: no MobileSync server".into())
        })?;

    let (display_name, email) = match response.user {
        Some(user) => (user.display_name, user.email_address),
        None => (None, None),
    };

    Ok(AutodiscoverOutcome::Settings {
        url: url.trim().to_string(),
        display_name,
        email,
    })
}
