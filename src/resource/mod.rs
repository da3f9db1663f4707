//! Host resources managed by phoenix
//!
//! Every resource follows the check → diff → act contract of
//! [`declarative::Resource`]: probes go through `ctx.runner.probe`, mutations
//! through `ctx.runner.act`, and applying a converged resource runs no act.

use declarative::{ApplyContext, CommandSpec, Error, Result};
use std::io;
use std::path::Path;

pub mod archive;
pub mod git_clone;
pub mod home;
pub mod luks;
pub mod mount;
pub mod package;
pub mod pinned;
pub mod service;
pub mod shell;
pub mod stow;
pub mod symlink;

#[cfg(test)]
pub mod testing;

pub use archive::ArchiveExtraction;
pub use git_clone::RepositoryClone;
pub use home::HomeDirectory;
pub use luks::EncryptedVolume;
pub use mount::Mount;
pub use package::PackageSet;
pub use pinned::PinnedPackages;
pub use service::ServiceSet;
pub use shell::LoginShell;
pub use stow::StowDeployment;
pub use symlink::Symlink;

/// Run a query and report whether it exited zero
pub(crate) fn probe_ok(ctx: &ApplyContext, program: &str, args: &[&str]) -> Result<bool> {
    ctx.runner.probe_status(&CommandSpec::root(program, args.iter().copied()))
}

/// Existence check that refuses to guess on unexpected I/O errors
pub(crate) fn path_exists(resource: &str, path: &Path) -> Result<bool> {
    match path.symlink_metadata() {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::state(
            resource,
            format!("cannot stat {}: {e}", path.display()),
        )),
    }
}

/// Render a path as a command argument
pub(crate) fn arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
