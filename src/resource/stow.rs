//! Dotfile deployment resource - GNU Stow restow as the owning user
//!
//! Stow computes its own diff, so there is no separate check: `stow -R` is
//! idempotent and runs for every package on every pass.

use declarative::{ApplyContext, ApplyResult, CommandSpec, Resource, ResourceState, Result};
use std::path::{Path, PathBuf};

use super::arg;

#[derive(Debug, Clone)]
pub struct StowDeployment {
    pub username: String,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub packages: Vec<String>,
}

impl StowDeployment {
    pub fn new(
        username: &str,
        source_dir: impl AsRef<Path>,
        target_dir: impl AsRef<Path>,
        packages: Vec<String>,
    ) -> Self {
        Self {
            username: username.to_string(),
            source_dir: source_dir.as_ref().to_path_buf(),
            target_dir: target_dir.as_ref().to_path_buf(),
            packages,
        }
    }
}

impl Resource for StowDeployment {
    fn id(&self) -> String {
        format!("stow:{}", self.target_dir.display())
    }

    fn description(&self) -> String {
        format!(
            "Stow {} package(s) from {} into {}",
            self.packages.len(),
            self.source_dir.display(),
            self.target_dir.display()
        )
    }

    fn resource_type(&self) -> &'static str {
        "stow"
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        Ok(ResourceState::Unknown)
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if self.packages.is_empty() {
            return Ok(ApplyResult::NoChange);
        }

        for pkg in &self.packages {
            ctx.detail(format!("stowing {pkg}"));
            ctx.runner.act(&CommandSpec::user(
                &self.username,
                "stow",
                [
                    "-d".to_string(),
                    arg(&self.source_dir),
                    "-t".to_string(),
                    arg(&self.target_dir),
                    "-R".to_string(),
                    pkg.clone(),
                ],
            ))?;
        }
        Ok(ApplyResult::Modified)
    }
}
