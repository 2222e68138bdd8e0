//! Lifecycle events published by the object manager

use serde::Serialize;

/// Capacity of the lifecycle event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// An object instance was created and its agent notified.
    /// `index` is `None` for unmanaged creates.
    Created {
        index: Option<usize>,
        obj_type: u16,
        instance: u16,
    },
    /// A satellite object instance went away, either deleted with its
    /// gateway or reported missing by its owner
    Deleted {
        index: usize,
        obj_type: u16,
        instance: u16,
    },
    /// A gateway instance was deleted and its slot table cleared
    GatewayDeleted { index: usize },
}
