//! Repository clone resource

use declarative::{ApplyContext, ApplyResult, CommandSpec, Resource, ResourceState, Result};
use std::path::{Path, PathBuf};

use super::{arg, path_exists};

/// A git repository cloned once into a destination owned by the user.
/// An existing destination is never inspected or updated.
#[derive(Debug, Clone)]
pub struct RepositoryClone {
    pub username: String,
    pub url: String,
    pub destination: PathBuf,
}

impl RepositoryClone {
    pub fn new(username: &str, url: &str, destination: impl AsRef<Path>) -> Self {
        Self {
            username: username.to_string(),
            url: url.to_string(),
            destination: destination.as_ref().to_path_buf(),
        }
    }
}

impl Resource for RepositoryClone {
    fn id(&self) -> String {
        format!("clone:{}", self.destination.display())
    }

    fn description(&self) -> String {
        format!("Clone {} into {}", self.url, self.destination.display())
    }

    fn resource_type(&self) -> &'static str {
        "git_clone"
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        if path_exists(&self.id(), &self.destination)? {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if !self.needs_apply(ctx)? {
            return Ok(ApplyResult::NoChange);
        }

        ctx.runner.act(&CommandSpec::user(
            &self.username,
            "git",
            ["clone".to_string(), self.url.clone(), arg(&self.destination)],
        ))?;
        Ok(ApplyResult::Created)
    }
}
