//! Host path layout and home-relative expansion
//!
//! Phoenix runs as root, so `~` in a blueprint must never resolve to root's
//! `$HOME`. [`expand_home`] always expands against an explicit home directory,
//! normally the real user's.

use std::path::{Path, PathBuf};

/// Where device-mapper nodes appear
pub const DEFAULT_MAPPER_DIR: &str = "/dev/mapper";

/// Parent of per-user home directories
pub const DEFAULT_HOME_ROOT: &str = "/home";

/// Fixed filesystem roots the provisioner works under
///
/// Tests point these at a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    pub mapper_dir: PathBuf,
    pub home_root: PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            mapper_dir: PathBuf::from(DEFAULT_MAPPER_DIR),
            home_root: PathBuf::from(DEFAULT_HOME_ROOT),
        }
    }
}

impl SystemPaths {
    /// Device node of an unlocked volume
    pub fn mapper_device(&self, mapper_name: &str) -> PathBuf {
        self.mapper_dir.join(mapper_name)
    }

    /// Home directory of a user
    pub fn home_of(&self, username: &str) -> PathBuf {
        self.home_root.join(username)
    }
}

/// Expand a leading `~` or `~/` against the given home directory.
///
/// Only the current-user forms are expanded; `~other/...`, `$VARS` and
/// absolute paths are returned unchanged.
///
/// # Examples
///
/// ```ignore
/// use std::path::Path;
///
/// let p = expand_home("~/.dotfiles", Path::new("/home/ack"));
/// assert_eq!(p, Path::new("/home/ack/.dotfiles"));
/// ```
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    let home = home.to_string_lossy().into_owned();
    PathBuf::from(shellexpand::tilde_with_context(path, || Some(home)).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "/home/ack";

    #[test]
    fn test_expand_bare_tilde() {
        assert_eq!(expand_home("~", Path::new(HOME)), PathBuf::from(HOME));
    }

    #[test]
    fn test_expand_tilde_slash() {
        let result = expand_home("~/.dotfiles/stow", Path::new(HOME));
        assert_eq!(result, PathBuf::from("/home/ack/.dotfiles/stow"));
    }

    #[test]
    fn test_other_forms_unchanged() {
        for input in ["/srv/dotfiles", "~bob/x", "$HOME/x", "relative/~/x"] {
            assert_eq!(expand_home(input, Path::new(HOME)), PathBuf::from(input));
        }
    }

    #[test]
    fn test_default_layout() {
        let paths = SystemPaths::default();
        assert_eq!(paths.mapper_device("data"), PathBuf::from("/dev/mapper/data"));
        assert_eq!(paths.home_of("ack"), PathBuf::from("/home/ack"));
    }
}
