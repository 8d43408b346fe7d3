use std::future::Future;

use tokio::task::JoinSet;

/// Lifetime of a single worker event.
///
/// Anything an event handler still has in flight once it has produced its result
/// (a background cache refresh, showing a notification) must be registered with
/// [`ExtendableEvent::wait_until`]. The host awaits [`ExtendableEvent::settled`]
/// before it considers the event finished; dropping the event aborts whatever was
/// not awaited.
#[derive(Debug)]
pub struct ExtendableEvent {
    kind: &'static str,
    pending: JoinSet<()>,
}

impl ExtendableEvent {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, pending: JoinSet::new() }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Keeps the event alive until `work` completes. Starts running immediately.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.spawn(work);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Waits for all extended work.
    pub async fn settled(mut self) {
        while let Some(joined) = self.pending.join_next().await {
            if let Err(err) = joined {
                log::error!("[{}] Extended work did not finish: {err}", self.kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn settled_waits_for_every_registered_future() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut event = ExtendableEvent::new("fetch");
        for _ in 0..3 {
            let done = Arc::clone(&done);
            event.wait_until(async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(event.pending(), 3);

        event.settled().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn a_panicking_task_does_not_poison_the_rest() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut event = ExtendableEvent::new("push");
        event.wait_until(async { panic!("boom"); });
        let counter = Arc::clone(&done);
        event.wait_until(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        event.settled().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
