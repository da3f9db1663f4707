//! Blueprint configuration (`phoenix.yml`)
//!
//! The blueprint is the declarative restoration plan for one machine. All
//! sections are optional in the file; required keys are checked once by
//! [`Blueprint::validate`] so the engine never sees an incomplete plan.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default blueprint file name, relative to the working directory
pub const DEFAULT_BLUEPRINT: &str = "phoenix.yml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Blueprint {
    pub version: String,
    pub infrastructure: Infrastructure,
    pub system: SystemConfig,
    pub identity: Identity,
    pub userspace: UserSpace,
}

/// Storage layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Infrastructure {
    pub luks: Luks,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Luks {
    /// Block device holding the LUKS header (e.g. `/dev/nvme0n1p3`)
    pub device: String,
    /// Device-mapper name once unlocked
    pub mapper_name: String,
    pub mount_point: String,
}

/// OS-level packages and services
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub packages: Vec<String>,
    /// Installed and held at their current version
    pub pinned_packages: Vec<String>,
    pub services: Vec<String>,
}

/// Target user
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub username: String,
    /// Login shell; left untouched when empty
    pub shell: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserSpace {
    pub stow: Stow,
    pub links: Vec<Link>,
    pub repos: Vec<Repo>,
}

/// GNU Stow deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Stow {
    pub source_dir: String,
    pub target_dir: String,
    pub packages: Vec<String>,
}

/// A single symlink, `target` pointing at `source`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Link {
    pub source: String,
    pub target: String,
}

/// A git repository cloned once
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Repo {
    pub url: String,
    pub dest: String,
}

impl Blueprint {
    /// Read, parse and validate a blueprint file
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("Loading blueprint from: {}", path.display());

        if !path.exists() {
            bail!("blueprint file not found at: {}", path.display());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;

        let blueprint = Self::from_yaml(&content)
            .with_context(|| format!("Invalid blueprint: {}", path.display()))?;

        log::debug!(
            "Blueprint v{}: {} package(s), {} pinned, {} service(s)",
            blueprint.version,
            blueprint.system.packages.len(),
            blueprint.system.pinned_packages.len(),
            blueprint.system.services.len()
        );
        Ok(blueprint)
    }

    /// Parse and validate blueprint YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let blueprint: Self =
            serde_yaml::from_str(content).context("Failed to parse YAML structure")?;
        blueprint.validate()?;
        Ok(blueprint)
    }

    /// Ensure the keys the engine cannot run without are present
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("version", &self.version),
            ("infrastructure.luks.device", &self.infrastructure.luks.device),
            (
                "infrastructure.luks.mapper_name",
                &self.infrastructure.luks.mapper_name,
            ),
            (
                "infrastructure.luks.mount_point",
                &self.infrastructure.luks.mount_point,
            ),
            ("identity.username", &self.identity.username),
        ];

        for (key, value) in required {
            if value.trim().is_empty() {
                bail!("{key} is required");
            }
        }

        for (i, repo) in self.userspace.repos.iter().enumerate() {
            if repo.url.is_empty() || repo.dest.is_empty() {
                bail!("userspace.repos[{i}] needs both url and dest");
            }
        }
        for (i, link) in self.userspace.links.iter().enumerate() {
            if link.source.is_empty() || link.target.is_empty() {
                bail!("userspace.links[{i}] needs both source and target");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
version: "1"
infrastructure:
  luks:
    device: /dev/nvme0n1p3
    mapper_name: company_data
    mount_point: /mnt/company_data
system:
  packages: [git, zsh, stow]
  pinned_packages: [kernel]
  services: [sshd]
identity:
  username: ack
  shell: /usr/bin/zsh
userspace:
  stow:
    source_dir: ~/.dotfiles
    target_dir: ~
    packages: [zsh, nvim]
  links:
    - source: /mnt/company_data/projects
      target: ~/projects
  repos:
    - url: https://github.com/example/notes.git
      dest: ~/notes
"#;

    #[test]
    fn test_parse_full_blueprint() {
        let bp = Blueprint::from_yaml(FULL).unwrap();

        assert_eq!(bp.infrastructure.luks.mapper_name, "company_data");
        assert_eq!(bp.system.packages, vec!["git", "zsh", "stow"]);
        assert_eq!(bp.identity.shell, "/usr/bin/zsh");
        assert_eq!(bp.userspace.stow.target_dir, "~");
        assert_eq!(bp.userspace.links[0].target, "~/projects");
        assert_eq!(bp.userspace.repos[0].dest, "~/notes");
    }

    #[test]
    fn test_optional_sections_default_empty() {
        let bp = Blueprint::from_yaml(
            r#"
version: "1"
infrastructure:
  luks: { device: /dev/sda2, mapper_name: data, mount_point: /mnt/data }
identity: { username: ack }
"#,
        )
        .unwrap();

        assert!(bp.system.packages.is_empty());
        assert!(bp.identity.shell.is_empty());
        assert!(bp.userspace.repos.is_empty());
    }

    #[test]
    fn test_missing_required_key_is_named() {
        let err = Blueprint::from_yaml(
            r#"
version: "1"
infrastructure:
  luks: { device: /dev/sda2, mount_point: /mnt/data }
identity: { username: ack }
"#,
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "infrastructure.luks.mapper_name is required");
    }

    #[test]
    fn test_missing_version() {
        let err = Blueprint::from_yaml("identity: { username: ack }").unwrap_err();
        assert_eq!(err.to_string(), "version is required");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let bp = Blueprint::load(file.path()).unwrap();
        assert_eq!(bp.identity.username, "ack");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Blueprint::load(Path::new("/nonexistent/phoenix.yml")).unwrap_err();
        assert!(err.to_string().contains("blueprint file not found"));
    }
}
