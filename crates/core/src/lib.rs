//! Domain types for the AIGC task engine.
//!
//! Holds the task entity, its lifecycle state machine, create-request
//! validation and the shared error type. No internal crate dependencies.

pub mod env;
pub mod error;
pub mod state_machine;
pub mod task;
pub mod types;
