//! Agents reacting to satellite object creation and gateway deletion
//!
//! An agent declares the object type it cares about and optional hooks.
//! Agents are kept in registration order and never removed. Dispatch is a
//! linear scan: the first agent that matches and has the hook handles the
//! event, later agents for the same type are never called.
//!
//! The registry has no lock of its own; it lives inside the object
//! manager's state and is serialized by the manager's lock.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::UtilResult;

/// Called after an object instance is created.
///
/// Arguments are the gateway index (`None` for unmanaged creates), the
/// object type and the instance id.
pub type CreateHook = Arc<dyn Fn(Option<usize>, u16, u16) -> UtilResult<()> + Send + Sync>;

/// Called after a gateway instance and its satellites were deleted
pub type GatewayDeletedHook = Arc<dyn Fn(usize) -> UtilResult<()> + Send + Sync>;

/// Capability record for one object type
#[derive(Clone)]
pub struct Agent {
    obj_type: u16,
    on_create: Option<CreateHook>,
    on_gateway_deleted: Option<GatewayDeletedHook>,
}

impl Agent {
    pub fn new(obj_type: u16) -> Self {
        Self {
            obj_type,
            on_create: None,
            on_gateway_deleted: None,
        }
    }

    /// Set the creation hook.
    ///
    /// The hook runs while the manager's lock is held; it must not call
    /// back into the manager.
    pub fn on_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<usize>, u16, u16) -> UtilResult<()> + Send + Sync + 'static,
    {
        self.on_create = Some(Arc::new(hook));
        self
    }

    /// Set the gateway deletion hook
    pub fn on_gateway_deleted<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) -> UtilResult<()> + Send + Sync + 'static,
    {
        self.on_gateway_deleted = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("obj_type", &self.obj_type)
            .field("on_create", &self.on_create.is_some())
            .field("on_gateway_deleted", &self.on_gateway_deleted.is_some())
            .finish()
    }
}

/// Insertion-ordered list of agents
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: Agent) {
        debug!(obj_type = agent.obj_type, "Registered object agent");
        self.agents.push(agent);
    }

    /// Run the creation hook of the first agent for `obj_type` that has one
    pub fn dispatch_create(
        &self,
        index: Option<usize>,
        obj_type: u16,
        instance: u16,
    ) -> UtilResult<()> {
        let hook = self
            .agents
            .iter()
            .filter(|agent| agent.obj_type == obj_type)
            .find_map(|agent| agent.on_create.as_ref());

        match hook {
            Some(hook) => hook(index, obj_type, instance),
            None => Ok(()),
        }
    }

    /// Deletion hook of the first agent that has one, whatever its type
    pub fn gateway_deleted_hook(&self) -> Option<GatewayDeletedHook> {
        self.agents
            .iter()
            .find_map(|agent| agent.on_gateway_deleted.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UtilError;
    use parking_lot::Mutex;

    #[test]
    fn test_dispatch_without_agents_is_noop() {
        let registry = AgentRegistry::new();
        assert!(registry.dispatch_create(Some(0), 3303, 100).is_ok());
        assert!(registry.gateway_deleted_hook().is_none());
    }

    #[test]
    fn test_first_matching_agent_wins() {
        let log: Arc<Mutex<Vec<String>>> = Arc::default();
        let mut registry = AgentRegistry::new();

        let l = log.clone();
        registry.register(Agent::new(3303).on_create(move |idx, t, i| {
            l.lock().push(format!("first {:?} {} {}", idx, t, i));
            Ok(())
        }));
        let l = log.clone();
        registry.register(Agent::new(3303).on_create(move |_, _, _| {
            l.lock().push("second".into());
            Ok(())
        }));

        registry.dispatch_create(Some(2), 3303, 100).unwrap();
        assert_eq!(*log.lock(), vec!["first Some(2) 3303 100".to_string()]);
    }

    #[test]
    fn test_matching_agent_without_hook_is_skipped() {
        let log: Arc<Mutex<Vec<String>>> = Arc::default();
        let mut registry = AgentRegistry::new();

        registry.register(Agent::new(3303));
        let l = log.clone();
        registry.register(Agent::new(3303).on_create(move |_, _, i| {
            l.lock().push(format!("create {}", i));
            Ok(())
        }));

        registry.dispatch_create(None, 3303, 7).unwrap();
        assert_eq!(*log.lock(), vec!["create 7".to_string()]);
    }

    #[test]
    fn test_other_types_are_ignored() {
        let mut registry = AgentRegistry::new();
        registry.register(Agent::new(3304).on_create(|_, _, _| {
            Err(UtilError::InvalidArgument("wrong agent".into()))
        }));
        assert!(registry.dispatch_create(Some(0), 3303, 100).is_ok());
    }

    #[test]
    fn test_create_hook_error_propagates() {
        let mut registry = AgentRegistry::new();
        registry.register(Agent::new(3303).on_create(|_, _, _| {
            Err(UtilError::InvalidArgument("bad sensor".into()))
        }));
        let err = registry.dispatch_create(Some(0), 3303, 100).unwrap_err();
        assert!(matches!(err, UtilError::InvalidArgument(_)));
    }

    #[test]
    fn test_gateway_deleted_matches_on_hook_not_type() {
        let log: Arc<Mutex<Vec<String>>> = Arc::default();
        let mut registry = AgentRegistry::new();

        registry.register(Agent::new(3303).on_create(|_, _, _| Ok(())));
        let l = log.clone();
        registry.register(Agent::new(3304).on_gateway_deleted(move |idx| {
            l.lock().push(format!("deleted {}", idx));
            Ok(())
        }));
        let l = log.clone();
        registry.register(Agent::new(3303).on_gateway_deleted(move |_| {
            l.lock().push("late".into());
            Ok(())
        }));

        let hook = registry.gateway_deleted_hook().unwrap();
        hook(5).unwrap();
        assert_eq!(*log.lock(), vec!["deleted 5".to_string()]);
    }
}
