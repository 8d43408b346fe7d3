//! Offline cache and notification agent for the crossword shell.
//!
//! Lifecycle per cache generation: `Parsed -> Installing -> Installed -> Activating ->
//! Active`. Install precaches the shell assets into the generation's cache; activate
//! deletes every other cache and takes over requests. Only an active worker
//! intercepts fetches.

pub mod event;
pub mod host;
pub mod http;
pub mod notify;
pub mod reminder;
pub mod router;
pub mod runtime;
pub mod storage;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use reqwest::Url;

use crate::config::Config;
use event::ExtendableEvent;
use host::{AgentHost, WindowClient};
use http::{Fetcher, Request, Response};
use notify::{DISMISS_ACTION, Notification, PushPayload};
use router::Route;
use storage::{CacheEntry, CacheStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
    /// Install failed. The host may try installing again.
    Redundant,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Cannot {action} while {state:?}")]
    InvalidState { action: &'static str, state: WorkerState },
    #[error("Shell asset '{path}' does not resolve against the origin: {reason}")]
    InvalidAsset { path: String, reason: String },
    #[error("Could not fetch shell asset {url}: {reason}")]
    AssetUnreachable { url: String, reason: String },
    #[error("Shell asset {url} answered with status {status}")]
    AssetStatus { url: String, status: u16 },
    #[error("Cache storage failed: {0}")]
    Storage(String),
}

/// The network failed and there was nothing cached to fall back to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{url} is unavailable: {reason}")]
pub struct FetchError {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Dismissed,
    Focused(WindowClient),
    Opened(Url),
}

pub struct ServiceWorker {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<dyn CacheStorage>,
    host: Arc<dyn AgentHost>,
    state: Mutex<WorkerState>,
}

impl ServiceWorker {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        storage: Arc<dyn CacheStorage>,
        host: Arc<dyn AgentHost>,
    ) -> Arc<Self> {
        Arc::new(Self { config, fetcher, storage, host, state: Mutex::new(WorkerState::Parsed) })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: WorkerState) {
        let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        log::debug!("[ServiceWorker] {:?} -> {state:?}", *current);
        *current = state;
    }

    /// Moves `from` -> `to` atomically and returns the state it left, or reports the
    /// state we were actually in.
    fn transition(
        &self,
        action: &'static str,
        from: &[WorkerState],
        to: WorkerState,
    ) -> Result<WorkerState, LifecycleError> {
        let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !from.contains(&*current) {
            return Err(LifecycleError::InvalidState { action, state: *current });
        }
        log::debug!("[ServiceWorker] {:?} -> {to:?}", *current);
        Ok(std::mem::replace(&mut *current, to))
    }

    /// Picks up a generation installed by an earlier process. If the current
    /// generation's cache is the only one stored the worker is active; if older
    /// caches are still around it is installed and waiting for `activate`.
    /// Without a current cache the worker stays parsed.
    pub fn resume(&self) -> anyhow::Result<WorkerState> {
        let current = self.config.cache_name();
        let names = self.storage.cache_names()?;
        if !names.contains(&current) {
            return Ok(self.state());
        }

        let resumed = if names.len() == 1 { WorkerState::Active } else { WorkerState::Installed };
        self.transition("resume", &[WorkerState::Parsed], resumed)?;
        log::info!("[resume] Generation {current} resumed as {resumed:?}.");
        Ok(resumed)
    }

    /// Precaches every shell asset. One failure fails the whole install and nothing
    /// is written; retrying is up to the host. An installed generation may be
    /// installed again to refresh its assets.
    pub async fn install(&self) -> Result<(), LifecycleError> {
        self.transition(
            "install",
            &[WorkerState::Parsed, WorkerState::Redundant, WorkerState::Installed],
            WorkerState::Installing,
        )?;

        match self.precache().await {
            Ok(count) => {
                self.set_state(WorkerState::Installed);
                log::info!("[install] Cached {count} shell assets into {}.", self.config.cache_name());
                Ok(())
            }
            Err(err) => {
                self.set_state(WorkerState::Redundant);
                log::error!("[install] Install failed: {err}");
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<usize, LifecycleError> {
        let now = Utc::now();
        let mut entries = Vec::with_capacity(self.config.shell_assets.len());

        for path in &self.config.shell_assets {
            let url = self.config.origin.join(path).map_err(|err| LifecycleError::InvalidAsset {
                path: path.clone(),
                reason: err.to_string(),
            })?;

            let response = self
                .fetcher
                .fetch(&Request::get(url.clone()))
                .await
                .map_err(|err| LifecycleError::AssetUnreachable { url: url.to_string(), reason: format!("{err:#}") })?;
            if !response.ok() {
                return Err(LifecycleError::AssetStatus { url: url.to_string(), status: response.status });
            }

            entries.push(CacheEntry::from_response(url.as_str(), &response, now));
        }

        let count = entries.len();
        self.storage
            .put_all(&self.config.cache_name(), entries)
            .map_err(|err| LifecycleError::Storage(format!("{err:#}")))?;
        Ok(count)
    }

    /// Deletes every cache that isn't the current generation's, then takes over all
    /// open pages. Returns the names of the deleted caches. Activating an already
    /// active generation purges again and is otherwise a no-op.
    pub async fn activate(&self) -> Result<Vec<String>, LifecycleError> {
        let previous =
            self.transition("activate", &[WorkerState::Installed, WorkerState::Active], WorkerState::Activating)?;

        let purged = match self.purge_old_generations() {
            Ok(purged) => purged,
            Err(err) => {
                self.set_state(previous);
                return Err(err);
            }
        };

        if let Err(err) = self.host.claim_clients().await {
            log::warn!("[activate] Could not claim open pages: {err:#}");
        }

        self.set_state(WorkerState::Active);
        log::info!("[activate] {} is active; purged {} old caches.", self.config.cache_name(), purged.len());
        Ok(purged)
    }

    fn purge_old_generations(&self) -> Result<Vec<String>, LifecycleError> {
        let storage_err = |err: anyhow::Error| LifecycleError::Storage(format!("{err:#}"));
        let current = self.config.cache_name();

        let mut purged = Vec::new();
        for name in self.storage.cache_names().map_err(storage_err)? {
            if name == current {
                continue;
            }
            if self.storage.delete_cache(&name).map_err(storage_err)? {
                log::info!("[activate] Deleted old cache {name}.");
                purged.push(name);
            }
        }
        Ok(purged)
    }

    pub fn route(&self, request: &Request) -> Route {
        router::route(&self.config, request)
    }

    /// Serves one request. `Ok(None)` means the agent did not intercept it and the
    /// host should perform the request itself.
    pub async fn handle_fetch(
        self: &Arc<Self>,
        event: &mut ExtendableEvent,
        request: Request,
    ) -> Result<Option<Response>, FetchError> {
        if self.state() != WorkerState::Active {
            return Ok(None);
        }

        let route = self.route(&request);
        log::trace!("[handle_fetch] {} -> {route:?}", request.url);

        match route {
            Route::Passthrough => Ok(None),
            Route::ApiNetworkFirst => self.network_first(&request, true).await.map(Some),
            Route::NetworkFirst => self.network_first(&request, false).await.map(Some),
            Route::ShellStaleWhileRevalidate => self.stale_while_revalidate(event, request).await.map(Some),
        }
    }

    /// With `strict`, a non-2xx answer counts as a failure too, and 2xx answers are
    /// written back to the cache.
    async fn network_first(&self, request: &Request, strict: bool) -> Result<Response, FetchError> {
        let reason = match self.fetcher.fetch(request).await {
            Ok(response) if response.ok() => {
                if strict {
                    self.store(request, &response);
                }
                return Ok(response);
            }
            Ok(response) if !strict => return Ok(response),
            Ok(response) => format!("status {}", response.status),
            Err(err) => format!("{err:#}"),
        };

        match self.cached(request) {
            Some(entry) => {
                log::debug!("[network_first] Serving cached {} ({reason}).", request.url);
                Ok(entry.to_response())
            }
            None => Err(FetchError { url: request.url.to_string(), reason }),
        }
    }

    async fn stale_while_revalidate(
        self: &Arc<Self>,
        event: &mut ExtendableEvent,
        request: Request,
    ) -> Result<Response, FetchError> {
        let Some(entry) = self.cached(&request) else {
            return self.revalidate(&request).await;
        };

        let worker = Arc::clone(self);
        event.wait_until(async move {
            if let Err(err) = worker.revalidate(&request).await {
                log::debug!("[stale_while_revalidate] Keeping stale copy: {err}");
            }
        });
        Ok(entry.to_response())
    }

    /// Fetches from the network and overwrites the cache entry on a 2xx.
    async fn revalidate(&self, request: &Request) -> Result<Response, FetchError> {
        let response = self.fetcher.fetch(request).await.map_err(|err| FetchError {
            url: request.url.to_string(),
            reason: format!("{err:#}"),
        })?;
        if response.ok() {
            self.store(request, &response);
        }
        Ok(response)
    }

    fn cached(&self, request: &Request) -> Option<CacheEntry> {
        self.storage
            .lookup(&self.config.cache_name(), request.url.as_str())
            .inspect_err(|err| log::warn!("[cached] Cache read for {} failed: {err:#}", request.url))
            .ok()
            .flatten()
    }

    /// Cache writes never hold up a response; failures are only logged.
    fn store(&self, request: &Request, response: &Response) {
        let entry = CacheEntry::from_response(request.url.as_str(), response, Utc::now());
        if let Err(err) = self.storage.put(&self.config.cache_name(), entry) {
            log::warn!("[store] Cache write for {} failed: {err:#}", request.url);
        }
    }

    /// Shows a notification for a push message. The payload can't make this fail.
    pub fn handle_push(self: &Arc<Self>, event: &mut ExtendableEvent, payload: Option<&[u8]>) -> Notification {
        let notification = Notification::from_payload(PushPayload::parse(payload));

        let host = Arc::clone(&self.host);
        let shown = notification.clone();
        event.wait_until(async move {
            if let Err(err) = host.show_notification(&shown).await {
                log::error!("[handle_push] Could not show notification [{}]: {err:#}", shown.tag);
            }
        });
        notification
    }

    /// Closes the notification, then, unless it was dismissed, brings the player to
    /// its target page: an already-open window on that page if there is one,
    /// otherwise a new window.
    pub async fn handle_notification_click(
        &self,
        notification: &Notification,
        action: Option<&str>,
    ) -> anyhow::Result<ClickOutcome> {
        self.host.close_notification(notification).await;
        if action == Some(DISMISS_ACTION) {
            log::debug!("[notificationclick] [{}] dismissed.", notification.tag);
            return Ok(ClickOutcome::Dismissed);
        }

        let target = self.click_target(notification)?;
        let existing = self
            .host
            .window_clients()
            .await?
            .into_iter()
            .find(|client| is_on_page(&client.url, &target));

        match existing {
            Some(client) => {
                self.host.focus(&client).await?;
                Ok(ClickOutcome::Focused(client))
            }
            None => {
                self.host.open_window(&target).await?;
                Ok(ClickOutcome::Opened(target))
            }
        }
    }

    pub fn handle_notification_close(&self, notification: &Notification) {
        log::info!(
            "[notificationclose] [{}] ({}) closed without being opened.",
            notification.tag,
            notification.kind
        );
    }

    fn click_target(&self, notification: &Notification) -> anyhow::Result<Url> {
        let path = notification.url.as_deref().unwrap_or(&self.config.entry_path);
        Ok(self.config.origin.join(path)?)
    }
}

fn is_on_page(window: &Url, target: &Url) -> bool {
    window.origin() == target.origin()
        && router::under_prefix(window.path(), target.path())
}
