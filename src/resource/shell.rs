//! Login shell resource

use declarative::{ApplyContext, ApplyResult, CommandSpec, Error, Resource, ResourceState, Result};

/// A user's login shell as recorded in the account database
#[derive(Debug, Clone)]
pub struct LoginShell {
    pub username: String,
    pub shell: String,
}

impl LoginShell {
    pub fn new(username: &str, shell: &str) -> Self {
        Self {
            username: username.to_string(),
            shell: shell.to_string(),
        }
    }

    /// Shell field of the user's passwd entry
    fn current_shell(&self, ctx: &ApplyContext) -> Result<String> {
        let output = ctx
            .runner
            .probe(&CommandSpec::root("getent", ["passwd", self.username.as_str()]))?;
        if !output.success {
            return Err(Error::state(
                self.id(),
                format!("no passwd entry for '{}'", self.username),
            ));
        }

        let stdout = output.stdout_str();
        stdout
            .lines()
            .next()
            .and_then(|entry| entry.split(':').nth(6))
            .map(|s| s.trim().to_string())
            .ok_or_else(|| Error::state(self.id(), format!("malformed passwd entry: {stdout}")))
    }
}

impl Resource for LoginShell {
    fn id(&self) -> String {
        format!("shell:{}", self.username)
    }

    fn description(&self) -> String {
        format!("Set login shell of {} to {}", self.username, self.shell)
    }

    fn resource_type(&self) -> &'static str {
        "login_shell"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        let current = self.current_shell(ctx)?;
        if current == self.shell {
            Ok(self.desired_state())
        } else {
            Ok(ResourceState::Modified {
                from: current,
                to: self.shell.clone(),
            })
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(self.shell.clone()),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let current = self.current_state(ctx)?;
        if current == self.desired_state() {
            return Ok(ApplyResult::NoChange);
        }

        ctx.detail(format!("shell {current}"));
        ctx.runner.act(&CommandSpec::root(
            "usermod",
            ["-s", self.shell.as_str(), self.username.as_str()],
        ))?;
        Ok(ApplyResult::Modified)
    }
}
