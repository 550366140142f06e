//! Config command - View and validate airsync configuration
//!
//! Provides the `airsync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors
//! 3. Prints the path of the configuration file in use

use std::path::Path;

use airsync_core::config::Config;
use anyhow::{Context as _, Result};
use clap::Subcommand;
use tracing::info;

use super::{Context, PASSWORD_ENV};
use crate::output::Report;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Validate => self.execute_validate(ctx),
            ConfigCommand::Path => self.execute_path(ctx),
        }
    }

    fn execute_show(&self, ctx: &Context) -> Result<()> {
        let config = ctx.load_config_or_default();

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;

        let mut report = Report::success(format!("Configuration ({})", ctx.config_path.display()))
            .data("config_path", ctx.config_path.display().to_string())
            .data("config", json)
            .data("password_env", PASSWORD_ENV)
            .note("");
        for line in yaml.lines() {
            report = report.note(line);
        }
        report = report
            .note("")
            .note(format!("Password is read from ${PASSWORD_ENV}"));

        ctx.emit(&report);
        Ok(())
    }

    fn execute_validate(&self, ctx: &Context) -> Result<()> {
        let path = &ctx.config_path;
        info!(config_path = %path.display(), "Validating configuration");

        ctx.emit(&validation_report(path));
        Ok(())
    }

    fn execute_path(&self, ctx: &Context) -> Result<()> {
        if ctx.is_json() {
            ctx.emit(
                &Report::success(ctx.config_path.display().to_string())
                    .data("config_path", ctx.config_path.display().to_string())
                    .data("exists", ctx.config_path.exists()),
            );
        } else {
            // bare path, for use in shell substitutions
            println!("{}", ctx.config_path.display());
        }
        Ok(())
    }
}

/// Loads and validates the file at `path`
fn validation_report(path: &Path) -> Report {
    let shown = path.display().to_string();

    if !path.exists() {
        return Report::warning(format!("Configuration file not found at {shown}"))
            .data("valid", false)
            .data("config_path", shown)
            .data("errors", vec!["Configuration file not found"])
            .note("Defaults leave server.host and device.user empty; create the file first.");
    }

    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            let message = format!("{e:#}");
            return Report::failure(message.clone())
                .data("valid", false)
                .data("config_path", shown)
                .data("errors", vec![message]);
        }
    };

    let errors = config.validate();
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();

    if errors.is_empty() {
        return Report::success("Configuration is valid")
            .field("File", shown.clone())
            .data("valid", true)
            .data("config_path", shown)
            .data("errors", messages);
    }

    let mut report = Report::failure(format!(
        "Configuration has {} error{}:",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    ))
    .field("File", shown.clone())
    .data("valid", false)
    .data("config_path", shown)
    .data("errors", messages)
    .note("");
    for error in &errors {
        report = report.note(format!("  {} - {}", error.field, error.message));
    }
    report
}
