//! Asynchronous task execution.
//!
//! [`TaskService`] is the submission and query surface. Accepted tasks are
//! handed to the [`Dispatcher`], a bounded worker pool that runs each task
//! through [`TaskExecutor`] and falls back to running work on the
//! submitting caller when it is saturated.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod service;

pub use config::EngineConfig;
pub use dispatcher::{Admission, Dispatcher, DispatcherStats};
pub use error::ServiceError;
pub use executor::TaskExecutor;
pub use service::{CreatedTask, TaskService};
