//! LwM2M object engine contract
//!
//! The engine owns the actual object instances and their resource values.
//! Calls are synchronous and expected to complete in bounded time; the
//! lifecycle manager makes them while holding its lock.

use std::sync::Arc;

use crate::error::EngineResult;
use crate::path::ObjectPath;

/// Callback fired by the engine after a resource is written.
///
/// Receives the written resource path and the new value.
pub type PostWriteCallback = Arc<dyn Fn(&ObjectPath, &[u8]) -> EngineResult<()> + Send + Sync>;

/// Protocol engine operations used by the object manager
pub trait ObjectEngine: Send + Sync {
    /// Create the object instance at `path` (`type/instance`)
    fn create_obj_inst(&self, path: &ObjectPath) -> EngineResult<()>;

    /// Delete the object instance at `path` (`type/instance`)
    fn delete_obj_inst(&self, path: &ObjectPath) -> EngineResult<()>;

    /// Delete one instance of a multi-instance resource
    /// (`type/instance/resource/resource_instance`)
    fn delete_res_inst(&self, path: &ObjectPath) -> EngineResult<()>;

    /// Set an opaque resource value (`type/instance/resource`)
    fn set_opaque(&self, path: &ObjectPath, data: &[u8]) -> EngineResult<()>;

    /// Register a callback that runs after the resource at `path` is written
    fn register_post_write_callback(
        &self,
        path: &ObjectPath,
        cb: PostWriteCallback,
    ) -> EngineResult<()>;
}
