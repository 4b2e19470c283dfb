//! Table of in-flight transfers that can be aborted from outside the batch,
//! e.g. when the user presses "Cancel" on a progress notification.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::TransferId;
use crate::notify::Notifier;

/// Action id attached to in-progress notifications.
pub const CANCEL_ACTION: &str = "cancel";

/// Abort capability for one transfer. Cancelling is cooperative: the transfer
/// notices at its next I/O checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyActive(pub TransferId);

/// Shared by the downloader, its transfers and whoever routes cancel signals.
/// Cloning shares the same table.
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    entries: Arc<Mutex<HashMap<TransferId, CancelHandle>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TransferId, CancelHandle>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Cancellation registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Fails if another transfer is already registered under `id`.
    pub fn register(&self, id: TransferId, handle: CancelHandle) -> Result<(), AlreadyActive> {
        let mut entries = self.lock();
        if entries.contains_key(&id) {
            return Err(AlreadyActive(id));
        }
        debug!(%id, "registered transfer");
        entries.insert(id, handle);
        Ok(())
    }

    pub fn lookup(&self, id: &TransferId) -> Option<CancelHandle> {
        self.lock().get(id).cloned()
    }

    pub fn unregister(&self, id: &TransferId) -> Option<CancelHandle> {
        self.lock().remove(id)
    }

    /// Removes the entry and signals the transfer to stop. Returns false when
    /// nothing was registered, which is not an error: the transfer may simply
    /// have settled already.
    pub fn cancel(&self, id: &TransferId) -> bool {
        match self.unregister(id) {
            Some(handle) => {
                handle.cancel();
                info!(%id, "cancel requested");
                true
            }
            None => {
                debug!(%id, "cancel for unknown or settled transfer ignored");
                false
            }
        }
    }

    /// Forgets every entry. Does not cancel anything.
    pub fn clear_all(&self) {
        self.lock().clear();
    }

    pub fn is_active(&self, id: &TransferId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Routes a notification action to the transfer it belongs to. Unknown
/// actions and already-settled transfers are ignored.
pub fn handle_action(
    registry: &CancellationRegistry,
    notifier: &dyn Notifier,
    notification_id: &str,
    action_id: &str,
) -> bool {
    if action_id != CANCEL_ACTION {
        debug!(notification_id, action_id, "ignoring notification action");
        return false;
    }
    info!(notification_id, "cancel pressed");
    // Dismiss first: a transfer that settled meanwhile must not leave its
    // cancel button behind.
    notifier.cancel_notification(notification_id);
    registry.cancel(&TransferId::from_raw(notification_id))
}
