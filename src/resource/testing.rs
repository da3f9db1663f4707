//! In-memory host for resource and orchestrator tests
//!
//! [`FakeHost`] answers the probes phoenix issues (rpm, dnf versionlock,
//! systemctl, mountpoint, getent) from a small model and applies acts to it.
//! Acts that touch user-space paths (ln, mkdir, tar, git) are performed on
//! the real filesystem so path-based checks see their effect.

use declarative::{CommandOutput, CommandRunner, CommandSpec, Error, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct HostModel {
    pub installed: BTreeSet<String>,
    pub locked: BTreeSet<String>,
    pub enabled: BTreeSet<String>,
    pub active: BTreeSet<String>,
    pub mounts: BTreeSet<String>,
    pub shells: BTreeMap<String, String>,
    /// Where `cryptsetup open` materialises mapper nodes
    pub mapper_dir: Option<PathBuf>,
    pub fail_unlock: bool,
    pub versionlock_broken: bool,
    /// Canned failures for specific probe command lines
    pub broken_probes: BTreeMap<String, (i32, String)>,
}

/// Spy runner with a model of package, service, mount and account state
#[derive(Debug, Default)]
pub struct FakeHost {
    pub model: RefCell<HostModel>,
    pub acts: RefCell<Vec<CommandSpec>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installed(self, packages: &[&str]) -> Self {
        self.model
            .borrow_mut()
            .installed
            .extend(packages.iter().map(ToString::to_string));
        self
    }

    pub fn with_locked(self, packages: &[&str]) -> Self {
        self.model
            .borrow_mut()
            .locked
            .extend(packages.iter().map(ToString::to_string));
        self
    }

    pub fn with_service(self, name: &str, enabled: bool, active: bool) -> Self {
        {
            let mut model = self.model.borrow_mut();
            if enabled {
                model.enabled.insert(name.to_string());
            }
            if active {
                model.active.insert(name.to_string());
            }
        }
        self
    }

    pub fn with_shell(self, user: &str, shell: &str) -> Self {
        self.model
            .borrow_mut()
            .shells
            .insert(user.to_string(), shell.to_string());
        self
    }

    pub fn with_mapper_dir(self, dir: &Path) -> Self {
        self.model.borrow_mut().mapper_dir = Some(dir.to_path_buf());
        self
    }

    pub fn failing_unlock(self) -> Self {
        self.model.borrow_mut().fail_unlock = true;
        self
    }

    pub fn broken_versionlock(self) -> Self {
        self.model.borrow_mut().versionlock_broken = true;
        self
    }

    /// Make the probe with this exact command line exit with `code`
    pub fn with_broken_probe(self, command_line: &str, code: i32, stderr: &str) -> Self {
        self.model
            .borrow_mut()
            .broken_probes
            .insert(command_line.to_string(), (code, stderr.to_string()));
        self
    }

    /// Number of mutating commands run so far
    pub fn act_count(&self) -> usize {
        self.acts.borrow().len()
    }

    /// Command lines of every act, in order
    pub fn act_lines(&self) -> Vec<String> {
        self.acts.borrow().iter().map(CommandSpec::command_line).collect()
    }

    /// Forget recorded acts, keeping the model
    pub fn reset_acts(&self) {
        self.acts.borrow_mut().clear();
    }

    fn answer(&self, spec: &CommandSpec) -> CommandOutput {
        let model = self.model.borrow();
        if let Some((code, stderr)) = model.broken_probes.get(&spec.command_line()) {
            return CommandOutput::failed(*code, stderr.clone());
        }
        let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
        let yes = |hit: bool, miss: &str| {
            if hit {
                CommandOutput::ok("")
            } else {
                CommandOutput::failed(1, miss.to_string())
            }
        };

        match (spec.program.as_str(), args.as_slice()) {
            ("rpm", ["-q", pkg]) => yes(
                model.installed.contains(*pkg),
                &format!("package {pkg} is not installed"),
            ),
            ("dnf", ["versionlock", "list"]) => {
                if model.versionlock_broken {
                    return CommandOutput::failed(1, "No such command: versionlock");
                }
                let listing: String = model
                    .locked
                    .iter()
                    .map(|p| format!("{p}-0:1.0-1.fc40.*\n"))
                    .collect();
                CommandOutput::ok(listing)
            }
            ("systemctl", ["is-enabled", svc]) => yes(model.enabled.contains(*svc), "disabled"),
            ("systemctl", ["is-active", svc]) => yes(model.active.contains(*svc), "inactive"),
            ("mountpoint", ["-q", target]) => {
                if model.mounts.contains(*target) {
                    CommandOutput::ok("")
                } else {
                    CommandOutput::failed(32, "")
                }
            }
            ("getent", ["passwd", user]) => match model.shells.get(*user) {
                Some(shell) => CommandOutput::ok(format!(
                    "{user}:x:1000:1000:{user}:/home/{user}:{shell}\n"
                )),
                None => CommandOutput::failed(2, ""),
            },
            _ => CommandOutput::ok(""),
        }
    }

    fn mutate(&self, spec: &CommandSpec) -> Result<()> {
        let mut model = self.model.borrow_mut();
        let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();

        match (spec.program.as_str(), args.as_slice()) {
            ("cryptsetup", ["open", _, name, ..]) => {
                if model.fail_unlock {
                    return Err(Error::CommandFailed {
                        command: spec.to_string(),
                        code: Some(2),
                        stderr: "No key available with this passphrase.".into(),
                    });
                }
                if let Some(dir) = &model.mapper_dir {
                    let node = dir.join(name);
                    fs::write(&node, b"").map_err(|e| Error::io("create", node, e))?;
                }
            }
            ("dnf", ["install", rest @ ..]) => {
                model.installed.extend(
                    rest.iter()
                        .filter(|a| !a.starts_with('-'))
                        .map(ToString::to_string),
                );
            }
            ("dnf", ["versionlock", "add", pkg]) => {
                model.locked.insert((*pkg).to_string());
            }
            ("systemctl", ["enable", "--now", svc]) => {
                model.enabled.insert((*svc).to_string());
                model.active.insert((*svc).to_string());
            }
            ("mount", [_, target]) => {
                model.mounts.insert((*target).to_string());
            }
            ("usermod", ["-s", shell, user]) => {
                model.shells.insert((*user).to_string(), (*shell).to_string());
            }
            ("ln", ["-sfn", source, link]) => {
                let link = Path::new(link);
                if link.is_symlink() || link.is_file() {
                    fs::remove_file(link).map_err(|e| Error::io("remove", link, e))?;
                }
                std::os::unix::fs::symlink(source, link).map_err(|e| Error::io("link", link, e))?;
            }
            ("mkdir", ["-p", dir]) => {
                fs::create_dir_all(dir).map_err(|e| Error::io("create", *dir, e))?;
            }
            ("tar", ["-xzf", _, "-C", dest]) => {
                let marker = Path::new(dest).join(".bashrc");
                fs::write(&marker, b"# restored\n").map_err(|e| Error::io("write", marker, e))?;
            }
            ("git", ["clone", _, dest]) => {
                fs::create_dir_all(dest).map_err(|e| Error::io("create", *dest, e))?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl CommandRunner for FakeHost {
    fn probe(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        Ok(self.answer(spec))
    }

    fn act(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.acts.borrow_mut().push(spec.clone());
        self.mutate(spec)?;
        Ok(CommandOutput::ok(""))
    }
}
