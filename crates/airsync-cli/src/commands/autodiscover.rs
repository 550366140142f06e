//! Autodiscover command - Locate the sync endpoint for a mailbox
//!
//! Posts the autodiscover document to each candidate host in turn (the
//! mailbox domain, then `autodiscover.<domain>`, unless `--host` is given)
//! and follows address redirects a bounded number of times.

use airsync_core::domain::AutodiscoverOutcome;
use anyhow::{Context as _, Result};
use clap::Args;
use tracing::{debug, info, warn};

use super::{build_client, password_from_env, Context};
use crate::output::Report;

#[derive(Debug, Args)]
pub struct AutodiscoverCommand {
    /// Mailbox address to look up
    pub email: String,

    /// Autodiscover host, optionally with a scheme (defaults to the mailbox domain)
    #[arg(long)]
    pub host: Option<String>,

    /// Address redirects to follow before giving up
    #[arg(long, default_value_t = 3)]
    pub max_redirects: u32,
}

impl AutodiscoverCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let mut config = ctx.load_config_or_default();
        if config.device.user.trim().is_empty() {
            config.device.user = self.email.clone();
        }
        let client = build_client(&config, password_from_env()?)?;

        let mut email = self.email.clone();
        let mut redirects = 0u32;
        let mut trail: Vec<String> = Vec::new();

        loop {
            let outcome = discover(&client, &email, self.host.as_deref()).await?;

            match outcome {
                AutodiscoverOutcome::Redirect(target) => {
                    if redirects >= self.max_redirects {
                        ctx.emit(
                            &Report::failure(format!(
                                "Gave up after {redirects} redirect(s); last target was {target}"
                            ))
                            .data("email", self.email.as_str())
                            .data("redirects", trail.clone()),
                        );
                        anyhow::bail!("Too many autodiscover redirects");
                    }
                    redirects += 1;
                    info!(from = %email, to = %target, redirects, "Following autodiscover redirect");
                    trail.push(target.clone());
                    email = target;
                }
                AutodiscoverOutcome::Settings {
                    url,
                    display_name,
                    email: mailbox,
                } => {
                    let mut report = Report::success(format!("Sync endpoint for {email}"))
                        .field("URL", url.as_str())
                        .data("email", email.as_str())
                        .data("url", url.as_str())
                        .data("display_name", display_name.clone())
                        .data("mailbox", mailbox.clone())
                        .data("redirects", trail.clone());
                    if let Some(name) = display_name {
                        report = report.field("Display name", name);
                    }
                    if let Some(mailbox) = mailbox {
                        report = report.field("Mailbox", mailbox);
                    }
                    for target in &trail {
                        report = report.note(format!("Redirected to {target}"));
                    }
                    ctx.emit(&report);
                    return Ok(());
                }
                AutodiscoverOutcome::Error { status, message } => {
                    let status = status.unwrap_or_else(|| "unknown".into());
                    let message = message.unwrap_or_default();
                    ctx.emit(
                        &Report::failure(format!("Autodiscover failed (status {status}) {message}"))
                            .data("email", email.as_str())
                            .data(
                                "error",
                                serde_json::json!({ "status": status, "message": message }),
                            ),
                    );
                    anyhow::bail!("Server rejected autodiscover for {email}");
                }
            }
        }
    }
}

/// Tries every candidate host for `email`, returning the first answer
async fn discover(
    client: &airsync_client::AirSyncClient,
    email: &str,
    host: Option<&str>,
) -> Result<AutodiscoverOutcome> {
    let mut last_error = None;

    for candidate in candidate_hosts(email, host)? {
        debug!(host = %candidate, "Trying autodiscover host");
        match client.autodiscover(email, &candidate).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) => {
                warn!(host = %candidate, error = %e, "Autodiscover host failed");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(e).context(format!("Autodiscover failed for {email}")),
        None => anyhow::bail!("No autodiscover host to try for {email}"),
    }
}

/// Hosts to query for `email`, in order
fn candidate_hosts(email: &str, host: Option<&str>) -> Result<Vec<String>> {
    if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
        return Ok(vec![host.trim().to_string()]);
    }

    let domain = email
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim())
        .filter(|domain| !domain.is_empty())
        .with_context(|| format!("'{email}' is not a mailbox address"))?;

    Ok(vec![domain.to_string(), format!("autodiscover.{domain}")])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_from_domain() {
        assert_eq!(
            candidate_hosts("alice@example.com", None).unwrap(),
            vec!["example.com", "autodiscover.example.com"]
        );
    }

    #[test]
    fn test_explicit_host_wins() {
        assert_eq!(
            candidate_hosts("alice@example.com", Some("http://127.0.0.1:8080")).unwrap(),
            vec!["http://127.0.0.1:8080"]
        );
        assert_eq!(
            candidate_hosts("alice@example.com", Some("  ")).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_rejects_address_without_domain() {
        assert!(candidate_hosts("alice", None).is_err());
        assert!(candidate_hosts("alice@", None).is_err());
    }
}
