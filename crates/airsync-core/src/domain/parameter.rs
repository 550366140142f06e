//! Command parameters carried in the request query

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Query parameter names understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterName {
    AttachmentName,
    CollectionId,
    ItemId,
    LongId,
    Occurrence,
    Options,
    User,
}

impl ParameterName {
    /// Name used in the plain-text query
    pub const fn as_str(&self) -> &'static str {
        match self {
            ParameterName::AttachmentName => "AttachmentName",
            ParameterName::CollectionId => "CollectionId",
            ParameterName::ItemId => "ItemId",
            ParameterName::LongId => "LongId",
            ParameterName::Occurrence => "Occurrence",
            ParameterName::Options => "Options",
            ParameterName::User => "User",
        }
    }

    /// Tag byte used in the base64 query
    pub const fn code(&self) -> u8 {
        match self {
            ParameterName::AttachmentName => 0,
            ParameterName::CollectionId => 1,
            ParameterName::ItemId => 3,
            ParameterName::LongId => 4,
            ParameterName::Occurrence => 6,
            ParameterName::Options => 7,
            ParameterName::User => 8,
        }
    }
}

impl Display for ParameterName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter value: text, or a small integer (the options bitmask)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterValue {
    Text(String),
    Number(u32),
}

impl ParameterValue {
    /// Textual form used by the plain-text query
    pub fn to_text(&self) -> String {
        match self {
            ParameterValue::Text(s) => s.clone(),
            ParameterValue::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        ParameterValue::Number(value)
    }
}

/// Ordered parameter list
///
/// Iteration order is insertion order and is what ends up on the wire.
/// Duplicate names are not rejected; callers are expected not to add one
/// twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMap {
    entries: Vec<(ParameterName, ParameterValue)>,
}

impl ParameterMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter
    pub fn insert(&mut self, name: ParameterName, value: impl Into<ParameterValue>) {
        self.entries.push((name, value.into()));
    }

    /// Builder-style variant of [`ParameterMap::insert`]
    pub fn with(mut self, name: ParameterName, value: impl Into<ParameterValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// First value stored under `name`
    pub fn get(&self, name: ParameterName) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterName, &ParameterValue)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
