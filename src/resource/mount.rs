//! Mount resource

use declarative::{ApplyContext, ApplyResult, CommandSpec, Error, Resource, ResourceState, Result};
use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use super::arg;

/// `mountpoint -q` exit status for a path that is not a mount point
const NOT_A_MOUNTPOINT: i32 = 32;

/// A block device mounted at a target directory
#[derive(Debug, Clone)]
pub struct Mount {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Mount {
    pub fn new(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            target: target.as_ref().to_path_buf(),
        }
    }

    fn is_mounted(&self, ctx: &ApplyContext) -> Result<bool> {
        let target = arg(&self.target);
        let output = ctx
            .runner
            .probe(&CommandSpec::root("mountpoint", ["-q", target.as_str()]))?;
        match output.code {
            _ if output.success => Ok(true),
            Some(NOT_A_MOUNTPOINT) => Ok(false),
            code => Err(Error::state(
                self.id(),
                format!(
                    "mountpoint -q {} exited with {}: {}",
                    self.target.display(),
                    code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                    output.stderr_str().trim()
                ),
            )),
        }
    }
}

impl Resource for Mount {
    fn id(&self) -> String {
        format!("mount:{}", self.target.display())
    }

    fn description(&self) -> String {
        format!(
            "Mount {} at {}",
            self.source.display(),
            self.target.display()
        )
    }

    fn resource_type(&self) -> &'static str {
        "mount"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        if self.is_mounted(ctx)? {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if self.is_mounted(ctx)? {
            return Ok(ApplyResult::NoChange);
        }

        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(&self.target)
            .map_err(|e| Error::io("create mount point", &self.target, e))?;

        ctx.runner.act(&CommandSpec::root(
            "mount",
            [arg(&self.source), arg(&self.target)],
        ))?;
        Ok(ApplyResult::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::FakeHost;
    use declarative::{ErrorCategory, Recorder};
    use tempfile::TempDir;

    #[test]
    fn test_mounts_once_and_creates_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("mnt").join("data");
        let mount = Mount::new("/dev/mapper/data", &target);

        let host = FakeHost::new();
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);

        assert_eq!(mount.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert!(target.is_dir());
        assert_eq!(
            host.act_lines(),
            vec![format!("mount /dev/mapper/data {}", target.display())]
        );

        assert_eq!(mount.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
        assert_eq!(host.act_count(), 1);
    }

    #[test]
    fn test_mountpoint_failure_is_not_read_as_unmounted() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("data");
        let host = FakeHost::new().with_broken_probe(
            &format!("mountpoint -q {}", target.display()),
            1,
            "mountpoint: permission denied",
        );
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);

        let err = Mount::new("/dev/mapper/data", &target)
            .apply(&mut ctx)
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::StateCheck);
        assert!(err.to_string().contains("permission denied"));
        assert_eq!(host.act_count(), 0);
        assert!(!target.exists());
    }
}
