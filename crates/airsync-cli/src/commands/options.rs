//! Options command - Query server capabilities
//!
//! Sends `OPTIONS` to the sync endpoint and reports the advertised protocol
//! versions and commands, plus the best version both sides speak.

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use super::{build_client, password_from_env, Context};
use crate::output::Report;

#[derive(Debug, Args)]
pub struct OptionsCommand {}

impl OptionsCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let config = ctx.load_valid_config()?;
        let client = build_client(&config, password_from_env()?)?;

        info!(server = %client.base_url(), "Querying server capabilities");

        let caps = client
            .capabilities()
            .await
            .context("OPTIONS request failed")?;
        let best = caps.best_version();

        let mut report = Report::success(format!("Server {}", client.base_url()))
            .field("Versions", caps.versions.join(", "))
            .field("Commands", caps.commands.join(", "))
            .data("server", client.base_url())
            .data("versions", caps.versions.clone())
            .data("commands", caps.commands.clone())
            .data("best_version", best.map(|v| v.as_str()))
            .data("configured_version", config.device.protocol_version.as_str());

        match best {
            Some(version) => {
                report = report.field("Best version", version.as_str());
                if version.as_str() != config.device.protocol_version {
                    report = report.note(format!(
                        "Configured version is {}; set device.protocol_version to use another",
                        config.device.protocol_version
                    ));
                }
            }
            None => {
                report = report.warn("Server advertises no protocol version this client speaks")
            }
        }

        ctx.emit(&report);
        Ok(())
    }
}
