//! Connection liveness monitor.
//!
//! A boolean "transport is active" signal with change notification. The
//! `started` timestamp is set exactly while the connection is active.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::info;

/// Liveness of one node's transport connection.
#[derive(Debug)]
pub struct ConnectionMonitor {
    name: String,
    state: watch::Sender<bool>,
    started: RwLock<Option<DateTime<Utc>>>,
}

impl ConnectionMonitor {
    /// Inactive monitor for the connection called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let (state, _) = watch::channel(false);
        Self {
            name: name.into(),
            state,
            started: RwLock::new(None),
        }
    }

    /// Whether the connection is active.
    pub fn active(&self) -> bool {
        *self.state.borrow()
    }

    /// When the connection last became active; `None` while inactive.
    pub fn started(&self) -> Option<DateTime<Utc>> {
        *self.started.read()
    }

    /// Change notifications. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Set the liveness flag. Subscribers are only notified, and the
    /// timestamp only changes, when the value actually changes.
    pub fn set_active(&self, active: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == active {
                return false;
            }
            *self.started.write() = active.then(Utc::now);
            *current = active;
            true
        });
        if changed {
            info!(connection = %self.name, active, "Connection state changed");
        }
        changed
    }

    /// Resolve once the connection is active.
    pub async fn wait_until_active(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail while awaited.
        let _ = rx.wait_for(|active| *active).await;
    }
}
