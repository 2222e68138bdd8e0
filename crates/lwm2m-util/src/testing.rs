//! In-memory collaborators for tests and simulation
//!
//! [`InMemoryEngine`] stands in for the LwM2M engine and records every call;
//! [`InMemoryDirectory`] stands in for the gateway object table.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::thread;
use std::time::Duration;

use lwm2m_core::{
    DirectoryError, DirectoryResult, EngineError, EngineResult, GatewayDirectory, ObjectEngine,
    ObjectPath, PostWriteCallback, TableId,
};
use parking_lot::{Mutex, RwLock};

use crate::manager::ObjectManager;

/// Engine call recorded by [`InMemoryEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Create(ObjectPath),
    Delete(ObjectPath),
    DeleteResInst(ObjectPath),
    SetOpaque(ObjectPath),
    RegisterPostWrite(ObjectPath),
}

#[derive(Default)]
struct EngineState {
    instances: BTreeSet<(u16, u16)>,
    /// Maximum live instances per object type
    capacity: HashMap<u16, usize>,
    failing_deletes: HashSet<(u16, u16)>,
    values: HashMap<ObjectPath, Vec<u8>>,
    callbacks: HashMap<ObjectPath, PostWriteCallback>,
    calls: Vec<EngineCall>,
}

/// Object engine keeping instances and resource values in memory
#[derive(Default)]
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
    /// Simulated time spent inside create calls
    latency: Option<Duration>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` inside every create call
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Limit the number of live instances of `obj_type`
    pub fn set_capacity(&self, obj_type: u16, max: usize) {
        self.state.lock().capacity.insert(obj_type, max);
    }

    /// Make deletes of `type/instance` fail with an I/O error
    pub fn fail_delete(&self, obj_type: u16, instance: u16) {
        self.state.lock().failing_deletes.insert((obj_type, instance));
    }

    /// Drop an instance behind the manager's back, as a server delete would
    pub fn remove_instance(&self, obj_type: u16, instance: u16) -> bool {
        self.state.lock().instances.remove(&(obj_type, instance))
    }

    pub fn has_instance(&self, obj_type: u16, instance: u16) -> bool {
        self.state.lock().instances.contains(&(obj_type, instance))
    }

    /// Live instances as `(type, instance)`, sorted
    pub fn instances(&self) -> Vec<(u16, u16)> {
        self.state.lock().instances.iter().copied().collect()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().calls.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, EngineCall::Create(_)))
            .count()
    }

    pub fn value(&self, path: &ObjectPath) -> Option<Vec<u8>> {
        self.state.lock().values.get(path).cloned()
    }

    /// Write a resource as the server would, then run its post-write callback
    pub fn server_write(&self, path: &ObjectPath, data: &[u8]) -> EngineResult<()> {
        let cb = {
            let mut state = self.state.lock();
            if !state.instances.contains(&(path.obj_type, path.instance)) {
                return Err(EngineError::NotFound(path.to_string()));
            }
            state.values.insert(*path, data.to_vec());
            state.callbacks.get(path).cloned()
        };

        match cb {
            Some(cb) => cb(path, data),
            None => Ok(()),
        }
    }
}

impl ObjectEngine for InMemoryEngine {
    fn create_obj_inst(&self, path: &ObjectPath) -> EngineResult<()> {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }

        let mut state = self.state.lock();
        state.calls.push(EngineCall::Create(*path));

        let key = (path.obj_type, path.instance);
        if state.instances.contains(&key) {
            return Err(EngineError::AlreadyExists(path.to_string()));
        }
        if let Some(&max) = state.capacity.get(&path.obj_type) {
            let live = state
                .instances
                .iter()
                .filter(|(t, _)| *t == path.obj_type)
                .count();
            if live >= max {
                return Err(EngineError::NoMemory(path.to_string()));
            }
        }
        state.instances.insert(key);
        Ok(())
    }

    fn delete_obj_inst(&self, path: &ObjectPath) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push(EngineCall::Delete(*path));

        let key = (path.obj_type, path.instance);
        if state.failing_deletes.contains(&key) {
            return Err(EngineError::Io(format!("delete {} failed", path)));
        }
        if !state.instances.remove(&key) {
            return Err(EngineError::NotFound(path.to_string()));
        }
        state.values.retain(|p, _| (p.obj_type, p.instance) != key);
        Ok(())
    }

    fn delete_res_inst(&self, path: &ObjectPath) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push(EngineCall::DeleteResInst(*path));
        match state.values.remove(path) {
            Some(_) => Ok(()),
            None => Err(EngineError::NotFound(path.to_string())),
        }
    }

    fn set_opaque(&self, path: &ObjectPath, data: &[u8]) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push(EngineCall::SetOpaque(*path));
        state.values.insert(*path, data.to_vec());
        Ok(())
    }

    fn register_post_write_callback(
        &self,
        path: &ObjectPath,
        cb: PostWriteCallback,
    ) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push(EngineCall::RegisterPostWrite(*path));
        state.callbacks.insert(*path, cb);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct GatewayEntry {
    base_instance: u16,
    table: Option<TableId>,
}

/// Gateway object table with a fixed number of entries
pub struct InMemoryDirectory {
    max_instances: usize,
    entries: RwLock<HashMap<usize, GatewayEntry>>,
}

impl InMemoryDirectory {
    pub fn new(max_instances: usize) -> Self {
        Self {
            max_instances,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create the gateway entry at `index`. An existing entry is replaced
    /// and loses its slot table handle.
    pub fn add_gateway(&self, index: usize, base_instance: u16) {
        self.entries.write().insert(
            index,
            GatewayEntry {
                base_instance,
                table: None,
            },
        );
    }

    /// Change the base instance of an entry while keeping its slot table
    /// handle, as happens when a stale entry is reused for a new device
    pub fn rebase_gateway(&self, index: usize, base_instance: u16) -> bool {
        match self.entries.write().get_mut(&index) {
            Some(entry) => {
                entry.base_instance = base_instance;
                true
            }
            None => false,
        }
    }

    /// Delete the gateway entry at `index`.
    ///
    /// The manager's deletion handler runs first, while the entry still
    /// resolves, mirroring the gateway object's deletion hook.
    pub fn delete_gateway(&self, index: usize, manager: &ObjectManager) -> bool {
        let table = self.slot_table(index);
        manager.handle_gateway_deleted(index, table);
        self.entries.write().remove(&index).is_some()
    }

    pub fn gateway_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.entries.read().keys().copied().collect();
        indices.sort_unstable();
        indices
    }
}

impl GatewayDirectory for InMemoryDirectory {
    fn resolve_base_instance(&self, index: usize) -> DirectoryResult<u16> {
        if index >= self.max_instances {
            return Err(DirectoryError::UnknownIndex(index));
        }
        self.entries
            .read()
            .get(&index)
            .map(|entry| entry.base_instance)
            .ok_or(DirectoryError::NoInstance(index))
    }

    fn slot_table(&self, index: usize) -> Option<TableId> {
        self.entries.read().get(&index).and_then(|entry| entry.table)
    }

    fn set_slot_table(&self, index: usize, table: TableId) -> DirectoryResult<()> {
        match self.entries.write().get_mut(&index) {
            Some(entry) => {
                entry.table = Some(table);
                Ok(())
            }
            None => Err(DirectoryError::NoInstance(index)),
        }
    }
}
