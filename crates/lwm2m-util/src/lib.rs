//! lwm2m-util - Lifecycle manager for gateway-attached LwM2M objects
//!
//! A gateway exposes one gateway object instance per attached device.
//! Devices carry satellite objects (temperature, humidity, battery, ...)
//! whose instance ids are the device's base instance plus an offset. This
//! crate creates those satellites on demand, exactly once, and tears them
//! down with their gateway instance.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ObjectManager                          │
//! │   acquire_instance / release_instance / handle_gateway_deleted│
//! │                                                              │
//! │  ┌────────────────┐   one lock   ┌────────────────────────┐  │
//! │  │ AgentRegistry  │◄────────────►│ SlotArena              │  │
//! │  │ (create/delete │              │  SlotTable per gateway │  │
//! │  │  hooks)        │              │  Free/Created/Failed   │  │
//! │  └────────────────┘              └────────────────────────┘  │
//! └───────────────┬─────────────────────────────┬────────────────┘
//!                 │                             │
//!        ┌────────┴────────┐          ┌─────────┴─────────┐
//!        │  ObjectEngine   │          │ GatewayDirectory  │
//!        │ (create/delete) │          │ (index → base)    │
//!        └─────────────────┘          └───────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use lwm2m_util::testing::{InMemoryDirectory, InMemoryEngine};
//! use lwm2m_util::{ObjectManager, UtilConfig};
//!
//! let engine = Arc::new(InMemoryEngine::new());
//! let directory = Arc::new(InMemoryDirectory::new(16));
//! directory.add_gateway(2, 100);
//!
//! let manager = ObjectManager::new(engine, directory, UtilConfig::default());
//! assert_eq!(manager.acquire_instance(3303, 2, 1).unwrap(), 101);
//! ```

pub mod agent;
pub mod config;
#[cfg(feature = "config-data")]
pub mod config_store;
pub mod error;
pub mod event;
pub mod manager;
pub mod slot;
pub mod testing;

pub use agent::{Agent, AgentRegistry, CreateHook, GatewayDeletedHook};
pub use config::{ConfigDataConfig, UtilConfig};
#[cfg(feature = "config-data")]
pub use config_store::ConfigStore;
pub use error::{ErrorKind, UtilError, UtilResult};
pub use event::LifecycleEvent;
pub use manager::ObjectManager;
pub use slot::{Slot, SlotArena, SlotTable};

// Re-export collaborator contracts for convenience
pub use lwm2m_core::{
    DirectoryError, EngineError, EngineResult, GatewayDirectory, ObjectEngine, ObjectPath,
    PostWriteCallback, TableId,
};
