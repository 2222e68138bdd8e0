//! lwm2m-core - Collaborator contracts for gateway object management
//!
//! This crate defines the boundary between the object lifecycle manager
//! and the systems it drives:
//!
//! - [`ObjectEngine`] - the LwM2M protocol engine that owns object instances
//! - [`GatewayDirectory`] - the gateway object that maps device indices to
//!   base instances and keeps a slot-table handle per device
//! - [`ObjectPath`] - path construction shared by every engine call
//!
//! Nothing here holds state; implementations live in the embedding firmware
//! (or in `lwm2m_util::testing` for tests and simulation).

pub mod directory;
pub mod engine;
pub mod error;
pub mod path;

pub use directory::{GatewayDirectory, TableId};
pub use engine::{ObjectEngine, PostWriteCallback};
pub use error::{DirectoryError, DirectoryResult, EngineError, EngineResult};
pub use path::ObjectPath;
