//! In-process change notifications between views.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::persona::{LabelGroup, ModuleFlag};

/// Identity of one open view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ViewId(Uuid);

impl ViewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.0.simple().to_string();
        f.write_str(&id[..8])
    }
}

/// What a committed mutation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeCause {
    Flag(ModuleFlag),
    Labels(LabelGroup),
    Subject,
    Role,
    Theme,
    Sources,
    Order,
    Reset,
}

impl fmt::Display for ChangeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeCause::Flag(flag) => write!(f, "flag {}", flag),
            ChangeCause::Labels(group) => write!(f, "{} list", group.noun()),
            ChangeCause::Subject => f.write_str("subject"),
            ChangeCause::Role => f.write_str("role"),
            ChangeCause::Theme => f.write_str("theme"),
            ChangeCause::Sources => f.write_str("knowledge sources"),
            ChangeCause::Order => f.write_str("dashboard order"),
            ChangeCause::Reset => f.write_str("reset"),
        }
    }
}

/// Published after a view has persisted a change.
#[derive(Debug, Clone)]
pub struct ProfileChanged {
    pub origin: ViewId,
    pub fingerprint: String,
    pub cause: ChangeCause,
    pub at: DateTime<Utc>,
}

/// Broadcast channel shared by every view in a process.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ProfileChanged>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a change. Returns how many subscribers will see it.
    pub fn publish(&self, event: ProfileChanged) -> usize {
        // Err only means there are no subscribers.
        let delivered = self.tx.send(event).unwrap_or(0);
        trace!(delivered, "Published profile change");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProfileChanged> {
        self.tx.subscribe()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(64)
    }
}
