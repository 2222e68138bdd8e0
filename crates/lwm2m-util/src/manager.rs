//! Object manager for gateway-attached satellite object instances
//!
//! The manager creates satellite objects (sensors behind a gateway device)
//! at most once, remembers failed creates so exhausted engine capacity is
//! not hammered, and tears everything down when the gateway instance goes
//! away.
//!
//! # Locking
//!
//! One mutex guards the slot arena and the agent registry. Every lifecycle
//! operation holds it for its full duration, including the engine calls it
//! makes, so concurrent acquires of the same satellite are strictly
//! ordered: the second caller sees the first caller's `Created` or `Failed`
//! slot and never issues a second create.
//!
//! Agent creation hooks run with the lock held. A creation hook that calls
//! back into [`ObjectManager::acquire_instance`] or
//! [`ObjectManager::release_instance`] deadlocks. Gateway deletion hooks run
//! after the lock is released.

use std::sync::Arc;

use lwm2m_core::{
    EngineResult, GatewayDirectory, ObjectEngine, ObjectPath, PostWriteCallback, TableId,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::agent::{Agent, AgentRegistry};
use crate::config::UtilConfig;
use crate::error::{UtilError, UtilResult};
use crate::event::{LifecycleEvent, EVENT_CHANNEL_CAPACITY};
use crate::slot::{Slot, SlotArena};

struct ManagerState {
    agents: AgentRegistry,
    arena: SlotArena,
}

/// Tracks and drives the lifecycle of satellite object instances
pub struct ObjectManager {
    engine: Arc<dyn ObjectEngine>,
    directory: Arc<dyn GatewayDirectory>,
    config: UtilConfig,
    state: Mutex<ManagerState>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl ObjectManager {
    pub fn new(
        engine: Arc<dyn ObjectEngine>,
        directory: Arc<dyn GatewayDirectory>,
        config: UtilConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let arena = SlotArena::new(config.max_instances, config.max_nodes);

        Self {
            engine,
            directory,
            config,
            state: Mutex::new(ManagerState {
                agents: AgentRegistry::new(),
                arena,
            }),
            events,
        }
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Register creation and gateway deletion hooks for an object type
    pub fn register_agent(&self, agent: Agent) {
        self.state.lock().agents.register(agent);
    }

    /// Get the instance id of satellite `offset` of type `obj_type` under the
    /// gateway at `index`, creating the object instance if needed.
    ///
    /// The instance id is the gateway's base instance plus `offset`. A slot
    /// whose create previously failed reports `ResourceExhausted` until a
    /// gateway deletion re-opens it.
    pub fn acquire_instance(&self, obj_type: u16, index: usize, offset: u16) -> UtilResult<u16> {
        let result = {
            let mut state = self.state.lock();
            self.acquire_locked(&mut state, obj_type, index, offset)
        };

        debug!(obj_type, index, offset, ?result, "Acquire instance");
        result
    }

    fn acquire_locked(
        &self,
        state: &mut ManagerState,
        obj_type: u16,
        index: usize,
        offset: u16,
    ) -> UtilResult<u16> {
        let base_instance = self.directory.resolve_base_instance(index)?;
        let instance = base_instance.checked_add(offset).ok_or_else(|| {
            UtilError::InvalidArgument(format!(
                "Instance {} + {} is out of range",
                base_instance, offset
            ))
        })?;

        let ManagerState { agents, arena } = state;
        let table_id = self.table_for(arena, index, base_instance)?;
        let table = arena
            .get_mut(table_id)
            .ok_or_else(|| UtilError::NotFound(format!("Slot table {}", table_id)))?;

        let exhausted = UtilError::ResourceExhausted { obj_type, instance };

        match table.find(obj_type, instance).and_then(|pos| table.get(pos)) {
            Some(Slot::Created { .. }) => return Ok(instance),
            // Creation can fail for other reasons, but lack of room is the likely one
            Some(Slot::Failed { .. }) => return Err(exhausted),
            _ => {}
        }

        let Some(pos) = table.find_free() else {
            error!(index, obj_type, instance, "Not enough object slots");
            return Err(exhausted);
        };

        let path = ObjectPath::object_instance(obj_type, instance);
        match self.engine.create_obj_inst(&path) {
            Ok(()) => {
                table.set(pos, Slot::Created { obj_type, instance });
                info!(%path, index, "Created object instance");
                // The object exists even if its agent fails; the slot stays created
                self.notify_created(agents, Some(index), obj_type, instance)?;
                Ok(instance)
            }
            Err(e) => {
                table.set(pos, Slot::Failed { obj_type, instance });
                warn!(%path, index, error = %e, "Unable to create object instance");
                Err(e.into())
            }
        }
    }

    /// Find or assign the slot table for `index`
    fn table_for(
        &self,
        arena: &mut SlotArena,
        index: usize,
        base_instance: u16,
    ) -> UtilResult<TableId> {
        match self.directory.slot_table(index) {
            None => {
                let id = TableId(index);
                let table = arena.get_mut(id).ok_or_else(|| {
                    UtilError::NotFound(format!("No slot table for gateway index {}", index))
                })?;
                table.stamp(base_instance);
                self.directory.set_slot_table(index, id).map_err(|e| {
                    error!(index, error = %e, "Unable to set slot table");
                    UtilError::from(e)
                })?;
                Ok(id)
            }
            Some(id) => {
                let table = arena.get_mut(id).ok_or_else(|| {
                    UtilError::NotFound(format!("Slot table {} for index {}", id, index))
                })?;
                match table.base_instance() {
                    Some(stamped) if stamped != base_instance => {
                        error!(index, stamped, base_instance, "Base instance mismatch");
                        Err(UtilError::Conflict {
                            index,
                            stamped,
                            resolved: base_instance,
                        })
                    }
                    Some(_) => Ok(id),
                    None => {
                        table.stamp(base_instance);
                        Ok(id)
                    }
                }
            }
        }
    }

    /// Report the outcome of an engine call on a satellite's path.
    ///
    /// When `status` says the instance no longer exists (or was rejected as
    /// already existing), the satellite's slot is freed so the next acquire
    /// creates it again. Any other status is ignored.
    pub fn release_instance<T>(
        &self,
        status: &EngineResult<T>,
        obj_type: u16,
        index: usize,
        instance: u16,
    ) -> UtilResult<()> {
        match status {
            Err(e) if e.is_missing_instance() => {}
            _ => return Ok(()),
        }

        let mut state = self.state.lock();
        let table = match self.directory.slot_table(index) {
            Some(id) => state.arena.get_mut(id),
            None => None,
        }
        .ok_or_else(|| UtilError::NotFound(format!("No slot table for gateway index {}", index)))?;

        match table.release(obj_type, instance) {
            Some(Slot::Created { .. }) => {
                self.publish(LifecycleEvent::Deleted {
                    index,
                    obj_type,
                    instance,
                });
                Ok(())
            }
            // A failed create left nothing behind in the engine
            Some(_) => Ok(()),
            None => {
                error!(index, obj_type, instance, "Unable to find matching slot");
                Err(UtilError::NotFound(format!(
                    "No slot for {} under gateway index {}",
                    ObjectPath::object_instance(obj_type, instance),
                    index
                )))
            }
        }
    }

    /// Delete every satellite of a gateway instance that is being deleted.
    ///
    /// Called from the gateway directory's deletion hook with the slot table
    /// it held for `index`. Engine delete failures are logged and do not
    /// stop the sweep. Each deletion re-opens failed slots of the same type
    /// in every table, since capacity was freed.
    pub fn handle_gateway_deleted(&self, index: usize, table: Option<TableId>) {
        let base_instance = match self.directory.resolve_base_instance(index) {
            Ok(base) => base,
            Err(e) => {
                error!(index, error = %e, "Invalid gateway instance");
                return;
            }
        };

        let Some(table_id) = table else {
            // No satellite was ever created for this gateway
            debug!(index, "No slot table for deleted gateway");
            return;
        };

        let hook = {
            let mut state = self.state.lock();
            let ManagerState { agents, arena } = &mut *state;

            let created = match arena.get(table_id) {
                Some(table) if table.base_instance() == Some(base_instance) => table.created(),
                Some(table) => {
                    error!(
                        index,
                        stamped = ?table.base_instance(),
                        base_instance,
                        "Base instance mismatch"
                    );
                    return;
                }
                None => {
                    error!(index, %table_id, "Unknown slot table");
                    return;
                }
            };

            for (obj_type, instance) in created {
                let path = ObjectPath::object_instance(obj_type, instance);
                match self.engine.delete_obj_inst(&path) {
                    Ok(()) => {
                        info!(%path, index, "Deleted object instance");
                        self.publish(LifecycleEvent::Deleted {
                            index,
                            obj_type,
                            instance,
                        });
                    }
                    Err(e) => warn!(%path, index, error = %e, "Unable to delete object instance"),
                }
                arena.reclaim_failed(obj_type);
            }

            if let Some(table) = arena.get_mut(table_id) {
                table.reset_all();
            }

            agents.gateway_deleted_hook()
        };

        self.publish(LifecycleEvent::GatewayDeleted { index });

        if let Some(hook) = hook {
            if let Err(e) = hook(index) {
                warn!(index, error = %e, "Gateway deleted hook failed");
            }
        }
    }

    /// Snapshot of the slots tracked for the gateway at `index`
    pub fn slot_states(&self, index: usize) -> Option<Vec<Slot>> {
        let id = self.directory.slot_table(index)?;
        let state = self.state.lock();
        state.arena.get(id).map(|table| table.slots().to_vec())
    }

    /// Create an object instance whose id is managed by the caller.
    ///
    /// Instances below the legacy offset are reserved for gateway-managed
    /// satellites and rejected.
    pub fn create_obj_inst(&self, obj_type: u16, instance: u16) -> UtilResult<()> {
        if instance < self.config.legacy_instance_offset {
            return Err(UtilError::InvalidArgument(format!(
                "Instance {} is below the managed range start {}",
                instance, self.config.legacy_instance_offset
            )));
        }

        let state = self.state.lock();
        let path = ObjectPath::object_instance(obj_type, instance);
        self.engine.create_obj_inst(&path)?;
        info!(%path, "Created unmanaged object instance");
        self.notify_created(&state.agents, None, obj_type, instance)
    }

    /// Delete an object instance
    pub fn delete_obj_instance(&self, obj_type: u16, instance: u16) -> UtilResult<()> {
        let path = ObjectPath::object_instance(obj_type, instance);
        self.engine.delete_obj_inst(&path)?;
        Ok(())
    }

    /// Delete one instance of a multi-instance resource
    pub fn delete_resource_instance(
        &self,
        obj_type: u16,
        instance: u16,
        resource: u16,
        resource_instance: u16,
    ) -> UtilResult<()> {
        let path = ObjectPath::resource_instance(obj_type, instance, resource, resource_instance);
        self.engine.delete_res_inst(&path)?;
        Ok(())
    }

    /// Run `cb` after the server writes the resource.
    ///
    /// Typically used to persist configuration written by the server.
    pub fn register_post_write_callback<F>(
        &self,
        obj_type: u16,
        instance: u16,
        resource: u16,
        cb: F,
    ) -> UtilResult<()>
    where
        F: Fn(&ObjectPath, &[u8]) -> EngineResult<()> + Send + Sync + 'static,
    {
        let path = ObjectPath::resource(obj_type, instance, resource);
        let cb: PostWriteCallback = Arc::new(cb);
        self.engine.register_post_write_callback(&path, cb)?;
        Ok(())
    }

    fn notify_created(
        &self,
        agents: &AgentRegistry,
        index: Option<usize>,
        obj_type: u16,
        instance: u16,
    ) -> UtilResult<()> {
        agents.dispatch_create(index, obj_type, instance)?;

        if self.config.broadcast_on_create {
            self.publish(LifecycleEvent::Created {
                index,
                obj_type,
                instance,
            });
        }
        Ok(())
    }

    fn publish(&self, event: LifecycleEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
