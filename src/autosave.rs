//! Dirty tracking and timer-based autosave.
//!
//! `AutoSave` is a constructed service object with an explicit lifecycle: the owning
//! application context builds one with an injected save operation, shares clones of the
//! handle with whatever needs to mark mutations, and calls `dispose` on teardown. There is
//! no module-level state.
//!
//! The state machine is Clean -> (any mutating action) -> Dirty -> (debounce interval
//! elapses or an explicit save succeeds) -> Clean. Every `mark_dirty` re-arms the debounce
//! timer; when it fires and the tracker is still dirty the injected save runs. A failed
//! automatic save is logged and the tracker stays dirty, so the next timer cycle or
//! explicit save retries; it is never surfaced as a blocking error.

use crate::Result;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default debounce interval between a mutation and the automatic save.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// The future returned by an injected save operation.
pub type SaveFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// The injected save operation.
pub type SaveFn = Arc<dyn Fn() -> SaveFuture + Send + Sync>;

/// A snapshot of the tracker's state.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct AutoSaveStatus {
    pub has_unsaved_changes: bool,
    pub last_save_time: Option<DateTime<Utc>>,
}

type Listener = Box<dyn Fn(&AutoSaveStatus) + Send + Sync>;

/// Identifies a subscription so it can be removed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ListenerId(u64);

struct Inner {
    status: Mutex<AutoSaveStatus>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: Mutex<u64>,
    save: SaveFn,
    interval: Duration,
    reset_tx: mpsc::UnboundedSender<()>,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Inner {
    fn is_dirty(&self) -> bool {
        self.status.lock().map(|s| s.has_unsaved_changes).unwrap_or(false)
    }

    fn set_dirty(&self) {
        if let Ok(mut status) = self.status.lock() {
            status.has_unsaved_changes = true;
        }
        self.notify();
    }

    fn set_clean(&self) {
        if let Ok(mut status) = self.status.lock() {
            status.has_unsaved_changes = false;
            status.last_save_time = Some(Utc::now());
        }
        self.notify();
    }

    /// Calls every listener with the current status. Listeners must not subscribe or
    /// unsubscribe from inside the callback.
    fn notify(&self) {
        let status = match self.status.lock() {
            Ok(status) => status.clone(),
            Err(_) => return,
        };
        if let Ok(listeners) = self.listeners.lock() {
            for (_, listener) in listeners.iter() {
                listener(&status);
            }
        }
    }
}

/// The process-wide dirty/timer tracker. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct AutoSave {
    inner: Arc<Inner>,
}

impl AutoSave {
    /// Builds the tracker and starts its timer task.
    pub fn new(save: SaveFn, interval: Duration) -> Self {
        let (reset_tx, reset_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            status: Mutex::new(AutoSaveStatus::default()),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: Mutex::new(0),
            save,
            interval,
            reset_tx,
            task: Mutex::new(None),
        });
        let task = tokio::spawn(run_timer(Arc::downgrade(&inner), reset_rx));
        if let Ok(mut slot) = inner.task.lock() {
            *slot = Some(task);
        }
        Self { inner }
    }

    /// Records that the in-memory model has unsaved mutations and re-arms the debounce
    /// timer. Listeners are notified on every call.
    pub fn mark_dirty(&self) {
        self.inner.set_dirty();
        // The timer task may already be gone after dispose; that is fine.
        let _ = self.inner.reset_tx.send(());
    }

    /// Records a successful save: clears the dirty flag and stamps the save time.
    pub fn mark_clean(&self) {
        self.inner.set_clean();
    }

    pub fn status(&self) -> AutoSaveStatus {
        self.inner
            .status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.is_dirty()
    }

    /// Subscribes to status changes. Every transition is delivered.
    pub fn subscribe(
        &self,
        listener: impl Fn(&AutoSaveStatus) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = {
            let mut next = match self.inner.next_listener_id.lock() {
                Ok(next) => next,
                Err(_) => return ListenerId(u64::MAX),
            };
            *next += 1;
            *next
        };
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push((id, Box::new(listener)));
        }
        ListenerId(id)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.retain(|(listener_id, _)| *listener_id != id.0);
        }
    }

    /// Best-effort save for process or tab teardown. Runs the injected save immediately if
    /// dirty and marks clean on success.
    ///
    /// This is not a durability guarantee: the environment may terminate before the write
    /// completes. Callers that can prompt the user should check `has_unsaved_changes` and
    /// ask for confirmation before allowing teardown to proceed.
    pub async fn flush(&self) -> Result<()> {
        if !self.inner.is_dirty() {
            return Ok(());
        }
        (self.inner.save)().await?;
        self.inner.set_clean();
        Ok(())
    }

    /// Stops the timer task. The tracker still records dirty/clean transitions afterwards,
    /// but nothing fires.
    pub fn dispose(&self) {
        if let Ok(mut slot) = self.inner.task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

async fn run_timer(inner: Weak<Inner>, mut reset_rx: mpsc::UnboundedReceiver<()>) {
    loop {
        // Parked until something marks the model dirty.
        if reset_rx.recv().await.is_none() {
            return;
        }
        'debounce: loop {
            let Some(strong) = inner.upgrade() else {
                return;
            };
            let interval = strong.interval;
            drop(strong);
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let Some(strong) = inner.upgrade() else {
                        return;
                    };
                    if !strong.is_dirty() {
                        break 'debounce;
                    }
                    debug!("Auto-save timer fired");
                    match (strong.save)().await {
                        Ok(()) => {
                            strong.set_clean();
                            break 'debounce;
                        }
                        // Stay dirty; the next cycle or an explicit save retries.
                        Err(e) => warn!("Auto-save failed: {e}"),
                    }
                }
                message = reset_rx.recv() => {
                    if message.is_none() {
                        return;
                    }
                    // Another mutation arrived; the debounce restarts.
                }
            }
        }
    }
}
