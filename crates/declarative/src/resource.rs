//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state.

use crate::context::ApplyContext;
use crate::error::Result;
use crate::types::{ApplyResult, ResourceState};
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource follows the same three-phase contract and must be safe to
/// apply any number of times with the same inputs:
///
/// 1. **Check** - [`current_state`](Self::current_state) inspects the host
///    with side-effect-free probes only.
/// 2. **Diff** - compare with [`desired_state`](Self::desired_state); when they
///    match, `apply` returns [`ApplyResult::NoChange`] without acting.
/// 3. **Act** - run the minimal command(s) that close the gap.
///
/// A probe that cannot tell what the state is must return an error. Guessing
/// "absent" or "present" would lead to a wrong act or a wrong skip.
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, ApplyResult, CommandSpec, Resource, ResourceState, Result};
///
/// #[derive(Debug)]
/// struct Touch { path: String }
///
/// impl Resource for Touch {
///     fn id(&self) -> String { self.path.clone() }
///     fn description(&self) -> String { format!("Ensure {} exists", self.path) }
///     fn resource_type(&self) -> &'static str { "file" }
///
///     fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
///         if std::path::Path::new(&self.path).exists() {
///             Ok(ResourceState::present())
///         } else {
///             Ok(ResourceState::Absent)
///         }
///     }
///
///     fn desired_state(&self) -> ResourceState { ResourceState::present() }
///
///     fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
///         if !self.needs_apply(ctx)? {
///             return Ok(ApplyResult::NoChange);
///         }
///         ctx.runner.act(&CommandSpec::root("touch", [&self.path]))?;
///         Ok(ApplyResult::Created)
///     }
/// }
/// ```
pub trait Resource: fmt::Debug {
    /// Unique identifier for this resource within its type
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, used for grouping in reports
    fn resource_type(&self) -> &'static str;

    /// Detect the current state of this resource
    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState>;

    /// Get the desired state for this resource
    fn desired_state(&self) -> ResourceState;

    /// Check if the resource needs changes to reach desired state
    fn needs_apply(&self, ctx: &ApplyContext) -> Result<bool> {
        let current = self.current_state(ctx)?;
        Ok(current != self.desired_state())
    }

    /// Apply changes to reach the desired state
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;
