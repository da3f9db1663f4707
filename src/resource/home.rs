//! Home directory resource

use declarative::{ApplyContext, ApplyResult, Error, Resource, ResourceState, Result};
use nix::unistd::{Gid, Uid, chown};
use std::fs;
use std::io;
use std::os::unix::fs::{DirBuilderExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Minimum permission bits a home directory must carry
const HOME_MODE: u32 = 0o755;

/// The real user's home directory: exists, is a directory, mode at least
/// 0755 and owned by the user
#[derive(Debug, Clone)]
pub struct HomeDirectory {
    pub path: PathBuf,
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, PartialEq, Eq)]
enum HomeState {
    Missing,
    Correct,
    /// Exists but mode or owner is off
    Drifted { mode: u32, uid: u32, gid: u32 },
}

impl HomeDirectory {
    pub fn new(path: impl AsRef<Path>, uid: u32, gid: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            uid,
            gid,
        }
    }

    fn check(&self) -> Result<HomeState> {
        let meta = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HomeState::Missing),
            Err(e) => return Err(Error::state(self.id(), e.to_string())),
        };

        if !meta.is_dir() {
            return Err(Error::state(
                self.id(),
                format!("{} exists but is not a directory", self.path.display()),
            ));
        }

        let mode = meta.mode() & 0o7777;
        if mode & HOME_MODE == HOME_MODE && meta.uid() == self.uid && meta.gid() == self.gid {
            Ok(HomeState::Correct)
        } else {
            Ok(HomeState::Drifted {
                mode,
                uid: meta.uid(),
                gid: meta.gid(),
            })
        }
    }

    fn set_mode(&self) -> Result<()> {
        fs::set_permissions(&self.path, fs::Permissions::from_mode(HOME_MODE))
            .map_err(|e| Error::io("chmod", &self.path, e))
    }

    /// Ownership is best effort: a failure is reported, not fatal
    fn set_owner(&self, ctx: &mut ApplyContext) {
        let (uid, gid) = (Uid::from_raw(self.uid), Gid::from_raw(self.gid));
        if let Err(e) = chown(&self.path, Some(uid), Some(gid)) {
            ctx.warn(format!(
                "could not chown {} to {}:{}: {e}",
                self.path.display(),
                self.uid,
                self.gid
            ));
        }
    }
}

impl Resource for HomeDirectory {
    fn id(&self) -> String {
        format!("home:{}", self.path.display())
    }

    fn description(&self) -> String {
        format!("Ensure home directory {}", self.path.display())
    }

    fn resource_type(&self) -> &'static str {
        "home"
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        Ok(match self.check()? {
            HomeState::Missing => ResourceState::Absent,
            HomeState::Correct => self.desired_state(),
            HomeState::Drifted { mode, uid, gid } => ResourceState::Modified {
                from: format!("{mode:o} {uid}:{gid}"),
                to: format!("{HOME_MODE:o} {}:{}", self.uid, self.gid),
            },
        })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(format!("{HOME_MODE:o} {}:{}", self.uid, self.gid)),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        match self.check()? {
            HomeState::Correct => Ok(ApplyResult::NoChange),
            HomeState::Missing => {
                ctx.detail(format!("creating {}", self.path.display()));
                fs::DirBuilder::new()
                    .recursive(true)
                    .mode(HOME_MODE)
                    .create(&self.path)
                    .map_err(|e| Error::io("create", &self.path, e))?;
                // umask may have narrowed the mode
                self.set_mode()?;
                self.set_owner(ctx);
                Ok(ApplyResult::Created)
            }
            HomeState::Drifted { mode, .. } => {
                if mode & HOME_MODE != HOME_MODE {
                    ctx.detail(format!("fixing mode {mode:o} -> {HOME_MODE:o}"));
                    self.set_mode()?;
                }
                self.set_owner(ctx);
                Ok(ApplyResult::Modified)
            }
        }
    }
}
