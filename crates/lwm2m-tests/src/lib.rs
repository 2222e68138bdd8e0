//! Integration tests for gateway object lifecycle management
//!
//! These tests drive `ObjectManager` through the in-memory engine and
//! gateway directory from `lwm2m_util::testing`:
//!
//! - `lifecycle_test.rs` - acquire, release, gateway deletion and reclamation
//! - `concurrency_test.rs` - many threads acquiring the same satellites
//! - `config_data_test.rs` - server writes persisted and restored
//!
//! ```bash
//! cargo test -p lwm2m-tests
//! ```

// This crate only contains tests, no library code
