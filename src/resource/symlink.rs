//! Symlink resource - `ln -sfn` run as the owning user

use declarative::{ApplyContext, ApplyResult, CommandSpec, Error, Resource, ResourceState, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::arg;

/// A symlink owned by a user
#[derive(Debug, Clone)]
pub struct Symlink {
    /// User the link is created as
    pub username: String,
    /// Source path (what the symlink points to)
    pub source: PathBuf,
    /// Target path (where the symlink is created)
    pub target: PathBuf,
}

#[derive(Debug)]
enum SymlinkState {
    Missing,
    Correct,
    WrongTarget(PathBuf),
    /// A regular file sits at the target path
    File,
    /// A real directory sits at the target path
    Directory,
}

impl Symlink {
    pub fn new(username: &str, source: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        Self {
            username: username.to_string(),
            source: source.as_ref().to_path_buf(),
            target: target.as_ref().to_path_buf(),
        }
    }

    /// Link contents are compared as written, without canonicalizing
    fn check(&self) -> Result<SymlinkState> {
        match fs::read_link(&self.target) {
            Ok(dest) if dest.as_os_str() == self.source.as_os_str() => Ok(SymlinkState::Correct),
            Ok(dest) => Ok(SymlinkState::WrongTarget(dest)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SymlinkState::Missing),
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                let meta = fs::symlink_metadata(&self.target)
                    .map_err(|e| Error::state(self.id(), e.to_string()))?;
                Ok(if meta.is_dir() {
                    SymlinkState::Directory
                } else {
                    SymlinkState::File
                })
            }
            Err(e) => Err(Error::state(self.id(), e.to_string())),
        }
    }

    fn link(&self, ctx: &mut ApplyContext) -> Result<()> {
        ctx.runner.act(&CommandSpec::user(
            &self.username,
            "ln",
            ["-sfn".to_string(), arg(&self.source), arg(&self.target)],
        ))?;
        Ok(())
    }
}

impl Resource for Symlink {
    fn id(&self) -> String {
        format!("link:{}", self.target.display())
    }

    fn description(&self) -> String {
        format!(
            "Symlink {} -> {}",
            self.target.display(),
            self.source.display()
        )
    }

    fn resource_type(&self) -> &'static str {
        "symlink"
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        Ok(match self.check()? {
            SymlinkState::Missing => ResourceState::Absent,
            SymlinkState::Correct => self.desired_state(),
            SymlinkState::WrongTarget(actual) => ResourceState::Modified {
                from: actual.to_string_lossy().to_string(),
                to: self.source.to_string_lossy().to_string(),
            },
            SymlinkState::File => ResourceState::Modified {
                from: "regular file".to_string(),
                to: format!("symlink -> {}", self.source.display()),
            },
            SymlinkState::Directory => ResourceState::Modified {
                from: "directory".to_string(),
                to: format!("symlink -> {}", self.source.display()),
            },
        })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(format!("-> {}", self.source.display())),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        match self.check()? {
            SymlinkState::Correct => Ok(ApplyResult::NoChange),
            SymlinkState::Missing => {
                self.link(ctx)?;
                Ok(ApplyResult::Created)
            }
            SymlinkState::WrongTarget(actual) => {
                ctx.detail(format!("repointing from {}", actual.display()));
                self.link(ctx)?;
                Ok(ApplyResult::Modified)
            }
            SymlinkState::File => {
                ctx.detail(format!("replacing regular file {}", self.target.display()));
                self.link(ctx)?;
                Ok(ApplyResult::Modified)
            }
            // ln -sfn would create the link inside the directory instead
            SymlinkState::Directory => Err(Error::state(
                self.id(),
                format!(
                    "{} is a directory, not a symlink; move it aside and re-run",
                    self.target.display()
                ),
            )),
        }
    }
}
