//! Package set resource - rpm queries, one batched dnf install

use declarative::{ApplyContext, ApplyResult, CommandSpec, Resource, ResourceState, Result};

use super::probe_ok;

/// Packages that must all be installed
#[derive(Debug, Clone)]
pub struct PackageSet {
    pub packages: Vec<String>,
}

impl PackageSet {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
        }
    }

    /// Packages not yet installed, in declaration order
    pub fn missing(&self, ctx: &ApplyContext) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for pkg in &self.packages {
            if !is_installed(ctx, pkg)? {
                missing.push(pkg.clone());
            }
        }
        Ok(missing)
    }
}

/// Whether rpm knows the package as installed
pub(crate) fn is_installed(ctx: &ApplyContext, package: &str) -> Result<bool> {
    probe_ok(ctx, "rpm", &["-q", package])
}

impl Resource for PackageSet {
    fn id(&self) -> String {
        format!("packages:{}", self.packages.join(","))
    }

    fn description(&self) -> String {
        format!("Install {} package(s)", self.packages.len())
    }

    fn resource_type(&self) -> &'static str {
        "package"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        let missing = self.missing(ctx)?;
        if missing.is_empty() {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Modified {
                from: format!("missing {}", missing.join(" ")),
                to: "installed".to_string(),
            })
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let missing = self.missing(ctx)?;
        if missing.is_empty() {
            return Ok(ApplyResult::NoChange);
        }

        ctx.detail(format!("installing {}", missing.join(" ")));
        let args = ["install", "-y", "--refresh"]
            .into_iter()
            .map(String::from)
            .chain(missing);
        ctx.runner.act(&CommandSpec::root("dnf", args))?;
        Ok(ApplyResult::Modified)
    }
}
