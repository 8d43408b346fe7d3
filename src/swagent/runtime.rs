use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::swagent::{
    ClickOutcome, FetchError, LifecycleError, ServiceWorker,
    event::ExtendableEvent,
    http::{Request, Response},
    notify::Notification,
};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("The agent has shut down")]
    ChannelClosed,
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

enum Command {
    Install {
        resp: oneshot::Sender<Result<(), LifecycleError>>,
    },
    Activate {
        resp: oneshot::Sender<Result<Vec<String>, LifecycleError>>,
    },
    Fetch {
        request: Request,
        resp: oneshot::Sender<Result<Option<Response>, FetchError>>,
    },
    Push {
        payload: Option<Vec<u8>>,
        resp: oneshot::Sender<Notification>,
    },
    NotificationClick {
        notification: Notification,
        action: Option<String>,
        resp: oneshot::Sender<anyhow::Result<ClickOutcome>>,
    },
    NotificationClose {
        notification: Notification,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Cloneable handle that delivers host events to a running agent.
#[derive(Clone)]
pub struct AgentHandle {
    cmd_tx: mpsc::Sender<Command>,
}

/// Runs `worker` on its own task.
///
/// Activate is handled on the loop itself. Every other event, install included, gets
/// its own task, which stays alive until the event's extended work has settled, so
/// a reply can go out before a background refresh has finished. Fetches that arrive
/// while an install is precaching are not intercepted.
pub fn spawn_agent(worker: Arc<ServiceWorker>) -> AgentHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);

    tokio::spawn(async move {
        let mut in_flight = JoinSet::new();

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Activate { resp } => {
                    let _ = resp.send(worker.activate().await);
                }
                Command::Shutdown { resp } => {
                    drain(&mut in_flight).await;
                    let _ = resp.send(());
                    return;
                }
                event => {
                    in_flight.spawn(dispatch(Arc::clone(&worker), event));
                }
            }

            while let Some(joined) = in_flight.try_join_next() {
                if let Err(err) = joined {
                    log::error!("[agent] Event task failed: {err}");
                }
            }
        }

        drain(&mut in_flight).await;
        log::debug!("[agent] All handles dropped; agent stopped.");
    });

    AgentHandle { cmd_tx }
}

async fn drain(in_flight: &mut JoinSet<()>) {
    while let Some(joined) = in_flight.join_next().await {
        if let Err(err) = joined {
            log::error!("[agent] Event task failed: {err}");
        }
    }
}

async fn dispatch(worker: Arc<ServiceWorker>, cmd: Command) {
    match cmd {
        Command::Install { resp } => {
            let _ = resp.send(worker.install().await);
        }
        Command::Fetch { request, resp } => {
            let mut event = ExtendableEvent::new("fetch");
            let _ = resp.send(worker.handle_fetch(&mut event, request).await);
            event.settled().await;
        }
        Command::Push { payload, resp } => {
            let mut event = ExtendableEvent::new("push");
            let _ = resp.send(worker.handle_push(&mut event, payload.as_deref()));
            event.settled().await;
        }
        Command::NotificationClick { notification, action, resp } => {
            let _ = resp.send(worker.handle_notification_click(&notification, action.as_deref()).await);
        }
        Command::NotificationClose { notification } => {
            worker.handle_notification_close(&notification);
        }
        Command::Activate { .. } | Command::Shutdown { .. } => {
            log::error!("[agent] Loop command reached an event task.");
        }
    }
}

impl AgentHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, AgentError> {
        let (resp, rx) = oneshot::channel();
        self.cmd_tx.send(make(resp)).await.map_err(|_| AgentError::ChannelClosed)?;
        rx.await.map_err(|_| AgentError::ChannelClosed)
    }

    pub async fn install(&self) -> Result<(), AgentError> {
        Ok(self.request(|resp| Command::Install { resp }).await??)
    }

    pub async fn activate(&self) -> Result<Vec<String>, AgentError> {
        Ok(self.request(|resp| Command::Activate { resp }).await??)
    }

    /// `Ok(None)`: not intercepted, the caller should go to the network itself.
    pub async fn fetch(&self, request: Request) -> Result<Option<Response>, AgentError> {
        Ok(self.request(|resp| Command::Fetch { request, resp }).await??)
    }

    pub async fn push(&self, payload: Option<Vec<u8>>) -> Result<Notification, AgentError> {
        self.request(|resp| Command::Push { payload, resp }).await
    }

    pub async fn notification_click(
        &self,
        notification: Notification,
        action: Option<String>,
    ) -> Result<ClickOutcome, AgentError> {
        Ok(self
            .request(|resp| Command::NotificationClick { notification, action, resp })
            .await??)
    }

    pub async fn notification_close(&self, notification: Notification) -> Result<(), AgentError> {
        self.cmd_tx
            .send(Command::NotificationClose { notification })
            .await
            .map_err(|_| AgentError::ChannelClosed)
    }

    /// Waits for in-flight events (including their background work) and stops the agent.
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        self.request(|resp| Command::Shutdown { resp }).await
    }
}
