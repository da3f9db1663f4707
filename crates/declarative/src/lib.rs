//! # Declarative
//!
//! A framework for idempotent, declarative host reconciliation.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, and converging a host to match it.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed (a package set,
//!   a mount, a symlink) following the check → diff → act contract
//! - **ResourceState**: The current or desired state of a resource
//! - **CommandRunner**: The only way a resource touches the host through an
//!   external command, split into `probe` (check) and `act` (mutate)
//! - **Reporter**: Receives semantic events; formatting and sinks live elsewhere
//! - **converge**: Applies resources in order and stops at the first failure
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`CommandRunner`]: Executes commands as root or as another user
//! - [`Reporter`]: Receives progress and warning events
//!
//! Tests substitute a spy runner and a [`Recorder`].

pub mod command;
pub mod context;
pub mod error;
pub mod executor;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use command::{CommandSpec, RunAs, Secret};
pub use context::{ApplyContext, CommandRunner, Event, Recorder, Reporter};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{apply_resource, converge};
pub use resource::{BoxedResource, Resource};
pub use types::{ApplyResult, CommandOutput, ExecuteSummary, ResourceState};
