use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;

use crate::swagent::notify::Notification;

/// An open page controlled by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: Url,
}

/// What the hosting environment lets the agent do outside of fetch handling.
#[async_trait]
pub trait AgentHost: Send + Sync {
    async fn show_notification(&self, notification: &Notification) -> Result<()>;

    async fn close_notification(&self, notification: &Notification);

    async fn window_clients(&self) -> Result<Vec<WindowClient>>;

    async fn focus(&self, client: &WindowClient) -> Result<()>;

    async fn open_window(&self, url: &Url) -> Result<()>;

    /// Takes control of already-open pages without waiting for a reload.
    async fn claim_clients(&self) -> Result<()>;
}

/// Host for running the agent headless: notifications go to the log and there
/// are never any windows to focus.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHost;

#[async_trait]
impl AgentHost for LoggingHost {
    async fn show_notification(&self, notification: &Notification) -> Result<()> {
        log::info!(
            "[LoggingHost] Notification '{}' [{}]{}: {}",
            notification.title,
            notification.tag,
            if notification.require_interaction { " (sticky)" } else { "" },
            notification.body
        );
        Ok(())
    }

    async fn close_notification(&self, notification: &Notification) {
        log::debug!("[LoggingHost] Closed notification [{}]", notification.tag);
    }

    async fn window_clients(&self) -> Result<Vec<WindowClient>> {
        Ok(Vec::new())
    }

    async fn focus(&self, client: &WindowClient) -> Result<()> {
        log::info!("[LoggingHost] Focus window {} at {}", client.id, client.url);
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<()> {
        log::info!("[LoggingHost] Open window at {url}");
        Ok(())
    }

    async fn claim_clients(&self) -> Result<()> {
        Ok(())
    }
}
