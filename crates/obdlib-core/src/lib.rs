//! obdlib-core: Core traits, types, and error definitions for obdlib.
//!
//! This crate defines the transport-agnostic abstractions that the ELM327
//! protocol engine builds on. Dashboards and data loggers depend on these
//! types without pulling in the serial transport or the engine itself.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel to the adapter
//! - [`Reply`] / [`Value`] -- decoded protocol replies and physical values
//! - [`ObdEvent`] -- asynchronous engine notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use obdlib_core::*`.
pub use error::{Error, Result};
pub use events::ObdEvent;
pub use transport::Transport;
pub use types::{Reply, Value};
