//! Pinned package resource - installed and held by dnf versionlock

use declarative::{ApplyContext, ApplyResult, CommandSpec, Error, Resource, ResourceState, Result};
use std::collections::BTreeSet;

use super::package::{PackageSet, is_installed};

/// dnf plugin providing the `versionlock` subcommand
pub const VERSIONLOCK_PLUGIN: &str = "python3-dnf-plugin-versionlock";

/// Packages that must be installed and version-locked
#[derive(Debug, Clone)]
pub struct PinnedPackages {
    pub packages: Vec<String>,
}

/// Package name of one `dnf versionlock list` line
///
/// dnf4 prints `name-epoch:version-release.*` per lock; dnf5 prints a
/// `Package name: name` line per lock. Exclusions (`!name-...`), comments
/// and metadata chatter yield nothing.
fn locked_name(line: &str) -> Option<&str> {
    let line = line.trim();
    if let Some(name) = line.strip_prefix("Package name:") {
        let name = name.trim();
        return (!name.is_empty()).then_some(name);
    }
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }

    let mut parts = line.rsplitn(3, '-');
    let _release = parts.next()?;
    let epoch_version = parts.next()?;
    let name = parts.next()?;
    (epoch_version.contains(':') && !name.is_empty() && !name.contains(char::is_whitespace))
        .then_some(name)
}

/// What one pinned package still lacks
#[derive(Debug, Clone, PartialEq, Eq)]
struct PinGap {
    package: String,
    installed: bool,
    locked: bool,
}

impl PinnedPackages {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
        }
    }

    /// Names currently held by versionlock. A failed listing is fatal.
    fn locked(&self, ctx: &ApplyContext) -> Result<BTreeSet<String>> {
        let output = ctx
            .runner
            .probe(&CommandSpec::root("dnf", ["versionlock", "list"]))?;
        if !output.success {
            return Err(Error::state(
                self.id(),
                format!("dnf versionlock list failed: {}", output.stderr_str().trim()),
            ));
        }
        Ok(output
            .stdout_str()
            .lines()
            .filter_map(locked_name)
            .map(str::to_string)
            .collect())
    }

    /// Packages that are not both installed and locked
    fn gaps(&self, ctx: &ApplyContext) -> Result<Vec<PinGap>> {
        let locks = self.locked(ctx)?;
        let mut gaps = Vec::new();
        for pkg in &self.packages {
            let installed = is_installed(ctx, pkg)?;
            let locked = locks.contains(pkg);
            if !(installed && locked) {
                gaps.push(PinGap {
                    package: pkg.clone(),
                    installed,
                    locked,
                });
            }
        }
        Ok(gaps)
    }

    fn plugin(&self) -> PackageSet {
        PackageSet::new([VERSIONLOCK_PLUGIN])
    }
}

impl Resource for PinnedPackages {
    fn id(&self) -> String {
        format!("pinned:{}", self.packages.join(","))
    }

    fn description(&self) -> String {
        format!("Install and lock {} package(s)", self.packages.len())
    }

    fn resource_type(&self) -> &'static str {
        "pinned_package"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        if self.packages.is_empty() {
            return Ok(ResourceState::present());
        }
        if !self.plugin().missing(ctx)?.is_empty() {
            return Ok(ResourceState::Modified {
                from: format!("{VERSIONLOCK_PLUGIN} missing"),
                to: "locked".to_string(),
            });
        }

        let gaps = self.gaps(ctx)?;
        if gaps.is_empty() {
            Ok(ResourceState::present())
        } else {
            let names: Vec<_> = gaps.iter().map(|g| g.package.as_str()).collect();
            Ok(ResourceState::Modified {
                from: format!("unpinned {}", names.join(" ")),
                to: "locked".to_string(),
            })
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if self.packages.is_empty() {
            return Ok(ApplyResult::NoChange);
        }

        let plugin = self.plugin().apply(ctx)?;
        let gaps = self.gaps(ctx)?;
        if gaps.is_empty() {
            return Ok(plugin);
        }

        for gap in gaps {
            if !gap.installed {
                ctx.detail(format!("installing {}", gap.package));
                ctx.runner
                    .act(&CommandSpec::root("dnf", ["install", "-y", gap.package.as_str()]))?;
            }
            if !gap.locked {
                ctx.detail(format!("locking {}", gap.package));
                ctx.runner.act(&CommandSpec::root(
                    "dnf",
                    ["versionlock", "add", gap.package.as_str()],
                ))?;
            }
        }
        Ok(ApplyResult::Modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::FakeHost;
    use declarative::{ErrorCategory, Recorder};

    #[test]
    fn test_ensures_plugin_then_installs_and_locks() {
        let host = FakeHost::new().with_installed(&["kernel"]);
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);
        let pinned = PinnedPackages::new(["kernel", "mesa-dri-drivers"]);

        assert_eq!(pinned.apply(&mut ctx).unwrap(), ApplyResult::Modified);
        assert_eq!(
            host.act_lines(),
            vec![
                format!("dnf install -y --refresh {VERSIONLOCK_PLUGIN}"),
                "dnf versionlock add kernel".to_string(),
                "dnf install -y mesa-dri-drivers".to_string(),
                "dnf versionlock add mesa-dri-drivers".to_string(),
            ]
        );

        host.reset_acts();
        assert!(!pinned.needs_apply(&ctx).unwrap());
        assert_eq!(pinned.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
        assert_eq!(host.act_count(), 0);
    }

    #[test]
    fn test_locked_but_missing_is_installed_only() {
        let host = FakeHost::new()
            .with_installed(&[VERSIONLOCK_PLUGIN])
            .with_locked(&["podman"]);
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);

        PinnedPackages::new(["podman"]).apply(&mut ctx).unwrap();
        assert_eq!(host.act_lines(), vec!["dnf install -y podman"]);
    }

    #[test]
    fn test_lock_on_similar_name_does_not_count() {
        let host = FakeHost::new()
            .with_installed(&[VERSIONLOCK_PLUGIN, "kernel"])
            .with_locked(&["kernel-headers"]);
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);
        let pinned = PinnedPackages::new(["kernel"]);

        assert!(pinned.needs_apply(&ctx).unwrap());
        assert_eq!(pinned.apply(&mut ctx).unwrap(), ApplyResult::Modified);
        assert_eq!(host.act_lines(), vec!["dnf versionlock add kernel"]);
    }

    #[test]
    fn test_lock_list_line_parsing() {
        assert_eq!(locked_name("kernel-0:6.8.5-301.fc40.*"), Some("kernel"));
        assert_eq!(
            locked_name("kernel-headers-0:6.8.3-300.fc40.*"),
            Some("kernel-headers")
        );
        assert_eq!(locked_name("Package name: mesa-dri-drivers"), Some("mesa-dri-drivers"));
        assert_eq!(locked_name("!podman-5:5.0.1-1.fc40.*"), None);
        assert_eq!(locked_name("# Added by 'versionlock add' command"), None);
        assert_eq!(
            locked_name("Last metadata expiration check: 0:12:01 ago on Mon 01 Apr 2024"),
            None
        );
        assert_eq!(locked_name(""), None);
    }

    #[test]
    fn test_unreadable_lock_list_is_fatal() {
        let host = FakeHost::new()
            .with_installed(&[VERSIONLOCK_PLUGIN, "kernel"])
            .broken_versionlock();
        let mut recorder = Recorder::new();
        let mut ctx = ApplyContext::new(&host, &mut recorder);

        let err = PinnedPackages::new(["kernel"]).apply(&mut ctx).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::StateCheck);
        assert_eq!(host.act_count(), 0);
    }
}
