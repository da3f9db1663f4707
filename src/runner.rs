//! Process execution with optional privilege drop
//!
//! [`SystemRunner`] is the only place that spawns processes. Commands run as
//! root inherit the current identity; commands run as a user get that user's
//! UID/GID set on the child before exec and `HOME` pointed at their home
//! directory, so nothing they create ends up owned by root.

use declarative::{CommandOutput, CommandRunner, CommandSpec, Error, Result, RunAs};
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::users::{SystemUsers, UserDatabase};

/// Identity a child process is switched to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

/// Resolve the credentials a command should run under
///
/// `Ok(None)` means "stay root".
pub fn credentials_for(spec: &CommandSpec, users: &dyn UserDatabase) -> Result<Option<Credentials>> {
    match &spec.run_as {
        RunAs::Root => Ok(None),
        RunAs::User(name) => {
            let account = users.require(name)?;
            Ok(Some(Credentials {
                uid: account.uid,
                gid: account.gid,
                home: account.home,
            }))
        }
    }
}

/// Output handling for a spawned command
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Capture everything, never fail on exit status
    Probe,
    /// Stream stdout to the terminal, capture stderr for diagnostics
    Act,
}

/// Runs commands on the real host
pub struct SystemRunner {
    users: SystemUsers,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self { users: SystemUsers }
    }

    fn build(&self, spec: &CommandSpec, mode: Mode) -> Result<Command> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);

        if let Some(creds) = credentials_for(spec, &self.users)? {
            // gid first: after setuid the process may no longer change groups
            cmd.gid(creds.gid).uid(creds.uid).env("HOME", &creds.home);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        cmd.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(match mode {
            Mode::Probe => Stdio::piped(),
            Mode::Act => Stdio::inherit(),
        });
        cmd.stderr(Stdio::piped());
        Ok(cmd)
    }

    fn execute(&self, spec: &CommandSpec, mode: Mode) -> Result<CommandOutput> {
        log::debug!("Running: {spec}");
        let mut cmd = self.build(spec, mode)?;

        let mut child = cmd.spawn().map_err(|source| Error::Spawn {
            command: spec.command_line(),
            source,
        })?;

        if let (Some(secret), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
            let payload = secret.expose().as_bytes().to_vec();
            // Detached: a failed write shows up as the child's exit status
            std::thread::spawn(move || {
                let _ = stdin.write_all(&payload);
            });
        }

        let output = child.wait_with_output().map_err(|source| Error::Spawn {
            command: spec.command_line(),
            source,
        })?;
        Ok(CommandOutput::from(output))
    }
}

impl CommandRunner for SystemRunner {
    fn probe(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.execute(spec, Mode::Probe)
    }

    fn act(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.execute(spec, Mode::Act)?;
        if output.success {
            Ok(output)
        } else {
            Err(Error::CommandFailed {
                command: spec.to_string(),
                code: output.code,
                stderr: output.stderr_str(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::StaticUsers;
    use declarative::{ErrorCategory, Secret};

    #[test]
    fn test_root_commands_keep_identity() {
        let spec = CommandSpec::root("dnf", ["install", "-y", "zsh"]);
        assert_eq!(credentials_for(&spec, &StaticUsers::new()).unwrap(), None);
    }

    #[test]
    fn test_user_commands_get_target_credentials() {
        let users = StaticUsers::new().with("ack", 1000, 1000).with("guest", 1001, 100);
        let spec = CommandSpec::user("guest", "git", ["clone", "u", "d"]);

        let creds = credentials_for(&spec, &users).unwrap().unwrap();
        assert_eq!(
            creds,
            Credentials {
                uid: 1001,
                gid: 100,
                home: PathBuf::from("/home/guest"),
            }
        );
    }

    #[test]
    fn test_unknown_user_is_precondition() {
        let spec = CommandSpec::user("ghost", "true", Vec::<String>::new());
        let err = credentials_for(&spec, &StaticUsers::new()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Precondition);
    }

    #[test]
    fn test_probe_returns_failed_output() {
        let runner = SystemRunner::new();
        let output = runner
            .probe(&CommandSpec::root("sh", ["-c", "echo nope >&2; exit 3"]))
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stderr_str().trim(), "nope");
    }

    #[test]
    fn test_act_fails_on_nonzero_exit() {
        let runner = SystemRunner::new();
        let err = runner
            .act(&CommandSpec::root("sh", ["-c", "echo broken >&2; exit 1"]))
            .unwrap_err();

        match err {
            Error::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr.trim(), "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let runner = SystemRunner::new();
        let err = runner
            .probe(&CommandSpec::root("phoenix-no-such-tool", ["x"]))
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[test]
    fn test_secret_is_written_to_stdin() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::root("cat", Vec::<String>::new()).with_stdin(Secret::new("hunter2"));

        let output = runner.probe(&spec).unwrap();
        assert_eq!(output.stdout_str(), "hunter2");
    }

    #[test]
    fn test_extra_env_reaches_child() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::root("sh", ["-c", "printf %s \"$PHOENIX_PROBE\""])
            .with_env("PHOENIX_PROBE", "on");

        assert_eq!(runner.probe(&spec).unwrap().stdout_str(), "on");
    }

    #[test]
    fn test_spawned_identity_matches_target() {
        if !nix::unistd::geteuid().is_root() {
            return;
        }
        let Ok(Some(nobody)) = SystemUsers.by_name("nobody") else {
            return;
        };

        let runner = SystemRunner::new();
        let spec = CommandSpec::user("nobody", "sh", ["-c", "printf '%s %s' \"$(id -u)\" \"$(id -g)\""]);
        let output = runner.probe(&spec).unwrap();

        assert_eq!(output.stdout_str(), format!("{} {}", nobody.uid, nobody.gid));
    }
}
