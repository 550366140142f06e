//! Device identity and account credentials

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity fields sent with every command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Account name placed in the `User=` query parameter
    pub user: String,
    pub device_id: String,
    pub device_type: String,
    /// Windows LCID, e.g. 1033 for en-US
    pub locale: u16,
    /// Policy key obtained from Provision; `None` before provisioning
    pub policy_key: Option<String>,
}

impl DeviceIdentity {
    pub fn new(
        user: impl Into<String>,
        device_id: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            device_id: device_id.into(),
            device_type: device_type.into(),
            locale: 1033,
            policy_key: None,
        }
    }

    pub fn with_locale(mut self, locale: u16) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_policy_key(mut self, policy_key: impl Into<String>) -> Self {
        self.policy_key = Some(policy_key.into());
        self
    }

    /// Policy key as the 32-bit integer the base64 query carries.
    ///
    /// Empty and non-numeric keys have no binary form.
    pub fn numeric_policy_key(&self) -> Option<u32> {
        self.policy_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .and_then(|k| k.parse::<u32>().ok())
    }
}

/// Basic-auth credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub domain: Option<String>,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            domain: None,
            password: password.into(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// User name sent in the Authorization header (`DOMAIN\user` when a
    /// domain is set)
    pub fn login(&self) -> String {
        match self.domain.as_deref().filter(|d| !d.is_empty()) {
            Some(domain) => format!("{domain}\\{}", self.user),
            None => self.user.clone(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("domain", &self.domain)
            .field("password", &"<redacted>")
            .finish()
    }
}
