//! Real-user resolution
//!
//! Phoenix runs as root, but home-directory and user-space work must be done
//! on behalf of the human who elevated. Evidence is consulted in order, first
//! success wins:
//!
//! 1. `SUDO_USER` - the invoking user named by sudo
//! 2. Owner of the `XAUTHORITY` file (X11 session)
//! 3. Owner of `XDG_RUNTIME_DIR` (Wayland session)

use declarative::{Error, Result};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::users::UserDatabase;

pub const ENV_SUDO_USER: &str = "SUDO_USER";
pub const ENV_XAUTHORITY: &str = "XAUTHORITY";
pub const ENV_XDG_RUNTIME_DIR: &str = "XDG_RUNTIME_DIR";

/// The human operator behind the root process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealUser {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
}

/// Where resolution evidence comes from
pub trait SessionEvidence {
    /// Read an environment variable; empty values count as unset
    fn var(&self, key: &str) -> Option<String>;

    /// Owner UID of a path, `None` if it cannot be read
    fn owner_uid(&self, path: &Path) -> Option<u32>;
}

/// Evidence from the live process environment and filesystem
pub struct HostEvidence;

impl SessionEvidence for HostEvidence {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn owner_uid(&self, path: &Path) -> Option<u32> {
        std::fs::metadata(path).ok().map(|m| m.uid())
    }
}

/// Determine which non-root identity user-space operations run as
pub fn resolve_real_user(
    evidence: &dyn SessionEvidence,
    users: &dyn UserDatabase,
) -> Result<RealUser> {
    if let Some(name) = evidence.var(ENV_SUDO_USER) {
        log::debug!("Found {ENV_SUDO_USER}: {name}");
        let account = users.by_name(&name)?.ok_or_else(|| {
            Error::precondition(format!("{ENV_SUDO_USER} names unknown user '{name}'"))
        })?;
        return Ok(RealUser {
            name: account.name,
            uid: account.uid,
            gid: account.gid,
        });
    }

    for key in [ENV_XAUTHORITY, ENV_XDG_RUNTIME_DIR] {
        if let Some(user) = from_owner(evidence, users, key)? {
            return Ok(user);
        }
    }

    Err(Error::precondition(format!(
        "unable to determine real user: no {ENV_SUDO_USER}, {ENV_XAUTHORITY} or \
         {ENV_XDG_RUNTIME_DIR} evidence available"
    )))
}

/// Resolve the owner of the path named by an environment variable
fn from_owner(
    evidence: &dyn SessionEvidence,
    users: &dyn UserDatabase,
    key: &str,
) -> Result<Option<RealUser>> {
    let Some(path) = evidence.var(key) else {
        return Ok(None);
    };
    log::debug!("Checking {key}: {path}");

    let Some(uid) = evidence.owner_uid(Path::new(&path)) else {
        return Ok(None);
    };
    // A root-owned session file says nothing about who elevated
    if uid == 0 {
        return Ok(None);
    }

    Ok(users.by_uid(uid)?.map(|account| {
        log::debug!("Resolved from {key}: {} (UID {uid})", account.name);
        RealUser {
            name: account.name,
            uid: account.uid,
            gid: account.gid,
        }
    }))
}
