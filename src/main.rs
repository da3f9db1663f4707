mod cli;
mod config;
mod engine;
mod identity;
mod paths;
mod report;
mod resource;
mod runner;
mod secrets;
mod session;
mod ui;
mod users;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use declarative::Error;
use std::io;

use config::Blueprint;
use engine::{Abort, Invocation, Provisioner};
use identity::{HostEvidence, resolve_real_user};
use report::LogReporter;
use runner::SystemRunner;
use secrets::Secrets;
use users::SystemUsers;

/// Commit baked in by build.rs, absent outside a git checkout
const COMMIT: Option<&str> = option_env!("PHOENIX_COMMIT");

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<Abort>() {
            // Already reported stage by stage
            Some(abort) => log_history(&abort.session),
            None => ui::error(&format!("{err:#}")),
        }
        std::process::exit(exit_code(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Provision => provision(&cli),
        Command::Version => {
            println!("{}", version_line(COMMIT));
            Ok(())
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "phoenix", &mut io::stdout());
            Ok(())
        }
    }
}

fn version_line(commit: Option<&str>) -> String {
    format!(
        "Fedora Phoenix {} (commit: {})",
        env!("CARGO_PKG_VERSION"),
        commit.unwrap_or("unknown")
    )
}

fn provision(cli: &Cli) -> Result<()> {
    let Some(secrets_path) = cli.secrets.as_deref() else {
        return Err(Error::precondition(
            "--secrets is required. Usage: sudo phoenix provision --secrets=/path/to/secrets.yml",
        )
        .into());
    };
    if !nix::unistd::geteuid().is_root() {
        return Err(Error::precondition("this command must be run as root (sudo)").into());
    }

    if !cli.quiet {
        ui::header("Initiating Phoenix Protocol");
    }

    // Who we act for must be known before the secrets file is consumed
    let operator = resolve_real_user(&HostEvidence, &SystemUsers)?;
    log::debug!("Operator: {} (UID {})", operator.name, operator.uid);

    let blueprint = Blueprint::load(&cli.blueprint)
        .map_err(|e| Error::precondition(format!("Failed to load blueprint: {e:#}")))?;
    let secrets = Secrets::load(secrets_path)
        .map_err(|e| Error::precondition(format!("Failed to load secrets: {e:#}")))?;
    secrets::destroy(secrets_path);

    let invocation = Invocation {
        blueprint,
        secrets,
        dotfiles_archive: cli.dotfiles_archive.clone(),
    };

    let runner = SystemRunner::new();
    let mut reporter = LogReporter::new(cli.quiet);
    let session = Provisioner::new(&runner, &SystemUsers, &HostEvidence)
        .run(&invocation, &mut reporter)?;
    log_history(&session);

    if !cli.quiet {
        let elapsed = chrono::Utc::now() - session.started_at();
        ui::header("Phoenix Protocol Complete");
        if let Some(user) = &session.real_user {
            ui::kv("user", &format!("{} ({}:{})", user.name, user.uid, user.gid));
        }
        if let Some(home) = &session.home {
            ui::kv("home", &home.display().to_string());
        }
        if let (Some(mapper), Some(mount)) = (&session.mapper_name, &session.mount_point) {
            let state = match (session.unlocked, session.mounted) {
                (true, true) => "unlocked, mounted",
                (true, false) => "unlocked, not mounted",
                _ => "locked",
            };
            ui::kv("volume", &format!("{mapper} at {} ({state})", mount.display()));
        }
        if let (Some(source), Some(target)) = (&session.stow_source, &session.stow_target) {
            ui::kv("dotfiles", &format!("{} -> {}", source.display(), target.display()));
        }
        if let Some(archive) = &session.dotfiles_archive {
            ui::kv("archive", &archive.display().to_string());
        }
        ui::kv("changes", &session.total_changes().to_string());
        ui::kv("elapsed", &format!("{}s", elapsed.num_seconds()));
        ui::success("Welcome back, Commander.");
    }
    Ok(())
}

fn log_history(session: &session::Session) {
    for t in session.history() {
        log::debug!(
            "{} -> {} at {} ({} changed)",
            t.from,
            t.to,
            t.at.format("%H:%M:%S"),
            t.changes
        );
    }
}

/// Exit status for a failed run, keyed by error category
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(abort) = err.downcast_ref::<Abort>() {
        return abort.exit_code();
    }
    if let Some(e) = err.downcast_ref::<Error>() {
        return e.exit_code();
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_by_category() {
        let precondition: anyhow::Error = Error::precondition("not root").into();
        assert_eq!(exit_code(&precondition), 2);

        let state: anyhow::Error = Error::state("pinned", "versionlock broken").into();
        assert_eq!(exit_code(&state), 4);

        let other = anyhow::anyhow!("clap exploded");
        assert_eq!(exit_code(&other), 1);
    }

    #[test]
    fn test_version_line_carries_commit() {
        let version = env!("CARGO_PKG_VERSION");
        assert_eq!(
            version_line(Some("3f2c1ab")),
            format!("Fedora Phoenix {version} (commit: 3f2c1ab)")
        );
        assert!(version_line(None).ends_with("(commit: unknown)"));
    }

    #[test]
    fn test_build_script_commit_is_never_empty() {
        if let Some(commit) = COMMIT {
            assert!(!commit.trim().is_empty());
            assert!(!version_line(COMMIT).contains("unknown"));
        }
    }
}
