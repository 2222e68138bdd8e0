//! Gateway directory contract
//!
//! The gateway object keeps one entry per physical device, addressed by an
//! opaque index. Each entry knows its base object instance and can carry a
//! handle to the slot table the manager uses for that device. When the
//! gateway instance is deleted the directory hands that handle back to the
//! manager through `ObjectManager::handle_gateway_deleted`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DirectoryResult;

/// Handle to one slot table in the manager's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId(pub usize);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// Gateway object operations used by the object manager
pub trait GatewayDirectory: Send + Sync {
    /// Base object instance of the gateway entry at `index`
    fn resolve_base_instance(&self, index: usize) -> DirectoryResult<u16>;

    /// Slot table handle previously stored for `index`
    fn slot_table(&self, index: usize) -> Option<TableId>;

    /// Store the slot table handle for `index`
    fn set_slot_table(&self, index: usize, table: TableId) -> DirectoryResult<()>;
}
