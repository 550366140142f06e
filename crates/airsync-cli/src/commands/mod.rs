//! CLI command implementations
//!
//! Each subcommand lives in its own module and receives a shared
//! [`Context`] carrying the global flags.

pub mod autodiscover;
pub mod config;
pub mod options;

use std::path::PathBuf;

use airsync_client::AirSyncClient;
use airsync_core::codec::BodyCodec;
use airsync_core::config::Config;
use airsync_core::domain::Credentials;
use anyhow::{Context as _, Result};

use crate::output::{OutputFormat, Report};

/// Environment variable holding the account password
pub const PASSWORD_ENV: &str = "AIRSYNC_PASSWORD";

/// Global options shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: PathBuf,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(config_path: Option<&str>, json: bool) -> Self {
        Self {
            config_path: config_path
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_path),
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Human
            },
        }
    }

    /// Prints `report` in the selected format
    pub fn emit(&self, report: &Report) {
        report.print(self.format);
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn load_config_or_default(&self) -> Config {
        Config::load_or_default(&self.config_path)
    }

    /// Loads the configuration and rejects it when validation fails
    pub fn load_valid_config(&self) -> Result<Config> {
        let config = Config::load(&self.config_path)?;
        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow::bail!(
                "Invalid configuration in {}: {}",
                self.config_path.display(),
                messages.join("; ")
            );
        }
        Ok(config)
    }
}

/// Reads the account password from [`PASSWORD_ENV`]
pub fn password_from_env() -> Result<String> {
    std::env::var(PASSWORD_ENV)
        .with_context(|| format!("Set {PASSWORD_ENV} to the account password"))
}

/// Builds a text-only client for `config`
///
/// The CLI ships no WBXML engine, so it only issues exchanges whose bodies
/// are plain text (OPTIONS, autodiscover).
pub fn build_client(config: &Config, password: String) -> Result<AirSyncClient> {
    let mut credentials = Credentials::new(config.device.user.clone(), password);
    if let Some(domain) = config.device.domain.as_deref().filter(|d| !d.is_empty()) {
        credentials = credentials.with_domain(domain);
    }
    AirSyncClient::new(config, credentials, BodyCodec::text_only())
        .context("Failed to create client")
}
