//! Service resource - systemd units enabled and running

use declarative::{ApplyContext, ApplyResult, CommandSpec, Resource, ResourceState, Result};

use super::probe_ok;

/// systemd units that must be enabled at boot and active now
#[derive(Debug, Clone)]
pub struct ServiceSet {
    pub services: Vec<String>,
}

impl ServiceSet {
    pub fn new<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            services: services.into_iter().map(Into::into).collect(),
        }
    }

    fn is_converged(ctx: &ApplyContext, service: &str) -> Result<bool> {
        Ok(probe_ok(ctx, "systemctl", &["is-enabled", service])?
            && probe_ok(ctx, "systemctl", &["is-active", service])?)
    }

    /// Units that are disabled or stopped, in declaration order
    pub fn pending(&self, ctx: &ApplyContext) -> Result<Vec<String>> {
        let mut pending = Vec::new();
        for svc in &self.services {
            if !Self::is_converged(ctx, svc)? {
                pending.push(svc.clone());
            }
        }
        Ok(pending)
    }
}

impl Resource for ServiceSet {
    fn id(&self) -> String {
        format!("services:{}", self.services.join(","))
    }

    fn description(&self) -> String {
        format!("Enable and start {} service(s)", self.services.len())
    }

    fn resource_type(&self) -> &'static str {
        "service"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        let pending = self.pending(ctx)?;
        if pending.is_empty() {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Modified {
                from: format!("not running {}", pending.join(" ")),
                to: "enabled and active".to_string(),
            })
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let pending = self.pending(ctx)?;
        if pending.is_empty() {
            return Ok(ApplyResult::NoChange);
        }

        for svc in &pending {
            ctx.detail(format!("enabling {svc}"));
            ctx.runner.act(&CommandSpec::root(
                "systemctl",
                ["enable", "--now", svc.as_str()],
            ))?;
        }
        Ok(ApplyResult::Modified)
    }
}
