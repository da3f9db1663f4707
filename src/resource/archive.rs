//! Archive extraction resource - restore a gzipped tarball into an empty
//! directory, as the owning user

use declarative::{ApplyContext, ApplyResult, CommandSpec, Error, Resource, ResourceState, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::arg;

#[derive(Debug, Clone)]
pub struct ArchiveExtraction {
    pub username: String,
    pub archive: PathBuf,
    pub destination: PathBuf,
}

impl ArchiveExtraction {
    pub fn new(username: &str, archive: impl AsRef<Path>, destination: impl AsRef<Path>) -> Self {
        Self {
            username: username.to_string(),
            archive: archive.as_ref().to_path_buf(),
            destination: destination.as_ref().to_path_buf(),
        }
    }

    /// A destination with any entry in it counts as already restored
    fn is_populated(&self) -> Result<bool> {
        match fs::read_dir(&self.destination) {
            Ok(mut entries) => Ok(entries.next().is_some()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::state(self.id(), e.to_string())),
        }
    }
}

impl Resource for ArchiveExtraction {
    fn id(&self) -> String {
        format!("archive:{}", self.destination.display())
    }

    fn description(&self) -> String {
        format!(
            "Extract {} into {}",
            self.archive.display(),
            self.destination.display()
        )
    }

    fn resource_type(&self) -> &'static str {
        "archive"
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        if self.is_populated()? {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if self.is_populated()? {
            ctx.detail(format!(
                "{} is not empty, skipping extraction",
                self.destination.display()
            ));
            return Ok(ApplyResult::NoChange);
        }
        if !self.archive.is_file() {
            return Err(Error::precondition(format!(
                "dotfiles archive not found: {}",
                self.archive.display()
            )));
        }

        ctx.runner.act(&CommandSpec::user(
            &self.username,
            "mkdir",
            ["-p".to_string(), arg(&self.destination)],
        ))?;
        ctx.runner.act(&CommandSpec::user(
            &self.username,
            "tar",
            [
                "-xzf".to_string(),
                arg(&self.archive),
                "-C".to_string(),
                arg(&self.destination),
            ],
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

    fn fixture() -> (TempDir, ArchiveExtraction) {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("dotfiles.tgz");
        fs::write(&archive, b"\x1f\x8b").unwrap();
        let extraction = ArchiveExtraction::new("ack", &archive, temp.path().join(".dotfiles"));
        (temp, extraction)
    }

    #[test]
    fn test_extracts_into_missing_destination_once() {
        let (_temp, extraction) = fixture();
        let host = FakeHost::new();
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);

        assert_eq!(extraction.apply(&mut ctx).unwrap(), ApplyResult::Created);
        let lines = host.act_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("mkdir -p "));
        assert!(lines[1].starts_with("tar -xzf "));

        assert_eq!(extraction.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
        assert_eq!(host.act_count(), 2);
    }

    #[test]
    fn test_empty_destination_is_extracted() {
        let (_temp, extraction) = fixture();
        fs::create_dir(&extraction.destination).unwrap();

        let host = FakeHost::new();
        let mut recorder = Recorder::new();
        let ctx = ApplyContext::new(&host, &mut recorder);
        assert!(extraction.needs_apply(&ctx).unwrap());
    }

    #[test]
    fn test_missing_archive_is_precondition() {
        let temp = TempDir::new().unwrap();
        let extraction =
            ArchiveExtraction::new("ack", temp.path().join("gone.tgz"), temp.path().join("d"));

        let host = FakeHost::new();
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);

        let err = extraction.apply(&mut ctx).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Precondition);
        assert_eq!(host.act_count(), 0);
    }
}
