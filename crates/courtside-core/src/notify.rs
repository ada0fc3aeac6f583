// "Lineup published" side channel.
//
// Fired after a save commits. Delivery runs on a detached tokio task; a
// failure is logged and never affects the save that triggered it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;
use crate::model::{MatchId, TeamId};

/// Receives "lineup published" events.
#[async_trait]
pub trait LineupPublisher: Send + Sync {
    async fn lineup_published(&self, match_id: MatchId, team_id: TeamId) -> anyhow::Result<()>;
}

/// JSON body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishPayload {
    pub match_id: MatchId,
    pub team_id: TeamId,
}

// ---------------------------------------------------------------------------
// WebhookPublisher
// ---------------------------------------------------------------------------

/// Posts [`PublishPayload`] to a fixed URL.
pub struct WebhookPublisher {
    http: reqwest::Client,
    url: String,
}

impl WebhookPublisher {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build webhook HTTP client")?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LineupPublisher for WebhookPublisher {
    async fn lineup_published(&self, match_id: MatchId, team_id: TeamId) -> anyhow::Result<()> {
        let payload = PublishPayload { match_id, team_id };
        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("failed to reach webhook {}", self.url))?;
        let status = response.status();
        response
            .error_for_status()
            .with_context(|| format!("webhook {} rejected publish", self.url))?;
        debug!(match_id, team_id, %status, "webhook accepted publish");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifier wrapper
// ---------------------------------------------------------------------------

/// Either an active publisher or disabled.
#[derive(Clone)]
pub enum Notifier {
    Active(Arc<dyn LineupPublisher>),
    Disabled,
}

impl Notifier {
    /// Build from `[notifications]`. Disabled unless enabled with a URL.
    pub fn from_config(config: &NotificationConfig) -> anyhow::Result<Self> {
        match (&config.webhook_url, config.enabled) {
            (Some(url), true) if !url.trim().is_empty() => {
                let publisher = WebhookPublisher::new(
                    url.trim().to_string(),
                    Duration::from_secs(config.timeout_secs),
                )?;
                Ok(Notifier::Active(Arc::new(publisher)))
            }
            _ => Ok(Notifier::Disabled),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Notifier::Active(_))
    }

    /// Fire the publish event without waiting for it.
    ///
    /// Returns the task handle, or `None` when disabled or when no tokio
    /// runtime is running on this thread.
    pub fn publish_detached(&self, match_id: MatchId, team_id: TeamId) -> Option<JoinHandle<()>> {
        let Notifier::Active(publisher) = self else {
            debug!(match_id, "notifications disabled; skipping publish");
            return None;
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(match_id, "no async runtime available; lineup publish skipped");
                return None;
            }
        };

        let publisher = Arc::clone(publisher);
        Some(runtime.spawn(async move {
            match publisher.lineup_published(match_id, team_id).await {
                Ok(()) => info!(match_id, team_id, "lineup published"),
                Err(e) => warn!(match_id, team_id, "lineup publish failed: {e:#}"),
            }
        }))
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notifier::Active(_) => f.write_str("Notifier::Active"),
            Notifier::Disabled => f.write_str("Notifier::Disabled"),
        }
    }
}
