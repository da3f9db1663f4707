//! Encrypted volume resource - LUKS unlock via cryptsetup

use declarative::{ApplyContext, ApplyResult, CommandSpec, Resource, ResourceState, Result, Secret};
use std::path::{Path, PathBuf};

use super::{arg, path_exists};

/// A LUKS volume that must be open under a device-mapper name
#[derive(Debug, Clone)]
pub struct EncryptedVolume {
    /// Block device holding the LUKS header
    pub device: PathBuf,
    pub mapper_name: String,
    /// Node that appears once the volume is open
    pub mapper_path: PathBuf,
    pub passphrase: Secret,
}

impl EncryptedVolume {
    pub fn new(
        device: impl AsRef<Path>,
        mapper_name: &str,
        mapper_path: impl AsRef<Path>,
        passphrase: Secret,
    ) -> Self {
        Self {
            device: device.as_ref().to_path_buf(),
            mapper_name: mapper_name.to_string(),
            mapper_path: mapper_path.as_ref().to_path_buf(),
            passphrase,
        }
    }

    /// Whether the mapper node is present
    pub fn is_unlocked(&self) -> Result<bool> {
        path_exists(&self.id(), &self.mapper_path)
    }

    fn open_command(&self) -> CommandSpec {
        CommandSpec::root(
            "cryptsetup",
            [
                "open".to_string(),
                arg(&self.device),
                self.mapper_name.clone(),
                "--type".to_string(),
                "luks".to_string(),
            ],
        )
        .with_stdin(self.passphrase.clone())
    }
}

impl Resource for EncryptedVolume {
    fn id(&self) -> String {
        format!("luks:{}", self.mapper_name)
    }

    fn description(&self) -> String {
        format!(
            "Unlock {} as {}",
            self.device.display(),
            self.mapper_path.display()
        )
    }

    fn resource_type(&self) -> &'static str {
        "luks"
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        if self.is_unlocked()? {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if self.is_unlocked()? {
            ctx.detail(format!("{} already unlocked", self.mapper_name));
            return Ok(ApplyResult::NoChange);
        }

        ctx.runner.act(&self.open_command())?;
        Ok(ApplyResult::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::FakeHost;
    use declarative::{ErrorCategory, Recorder};
    use tempfile::TempDir;

    fn volume(mapper_dir: &Path) -> EncryptedVolume {
        EncryptedVolume::new(
            "/dev/nvme0n1p3",
            "data",
            mapper_dir.join("data"),
            Secret::new("correct horse"),
        )
    }

    #[test]
    fn test_unlocks_once() {
        let temp = TempDir::new().unwrap();
        let host = FakeHost::new().with_mapper_dir(temp.path());
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);
        let vol = volume(temp.path());

        assert_eq!(vol.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert_eq!(vol.apply(&mut ctx).unwrap(), ApplyResult::NoChange);

        let acts = host.acts.borrow();
        assert_eq!(acts.len(), 1);
        assert_eq!(
            acts[0].command_line(),
            "cryptsetup open /dev/nvme0n1p3 data --type luks"
        );
        assert_eq!(
            acts[0].stdin.as_ref().map(Secret::expose),
            Some("correct horse")
        );
    }

    #[test]
    fn test_already_open_runs_nothing() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("data"), b"").unwrap();
        let host = FakeHost::new();
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);

        assert_eq!(
            volume(temp.path()).apply(&mut ctx).unwrap(),
            ApplyResult::NoChange
        );
        assert_eq!(host.act_count(), 0);
    }

    #[test]
    fn test_bad_passphrase_is_tool_error() {
        let temp = TempDir::new().unwrap();
        let host = FakeHost::new()
            .with_mapper_dir(temp.path())
            .failing_unlock();
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);

        let err = volume(temp.path()).apply(&mut ctx).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ExternalTool);
        assert!(!err.to_string().contains("correct horse"));
    }
}
