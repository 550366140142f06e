//! Raw request handed to the exchange pipeline

use serde::{Deserialize, Serialize};

use super::command::Command;
use super::parameter::{ParameterMap, ParameterName, ParameterValue};
use crate::codec::WBXML_CONTENT_TYPE;

/// HTTP method of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Post,
    Options,
}

/// A fully described command request
///
/// The XML body is opaque to the pipeline apart from the per-command
/// element stripping and the MIME extraction for legacy mail sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRequest {
    pub command: Command,
    pub method: HttpMethod,
    pub content_type: String,
    pub body: String,
    pub parameters: ParameterMap,
}

impl RawRequest {
    /// Creates a POST request with a WBXML body
    pub fn new(command: Command, body: impl Into<String>) -> Self {
        Self {
            command,
            method: HttpMethod::Post,
            content_type: WBXML_CONTENT_TYPE.to_string(),
            body: body.into(),
            parameters: ParameterMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: ParameterName, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(name, value);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Copy of this request carrying a different body
    pub fn with_body(&self, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..self.clone()
        }
    }
}
