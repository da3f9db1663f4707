//! Provisioning engine
//!
//! The engine walks a [`Session`] through the fixed stage order:
//! 1. Identity - resolve the real user, ensure their home directory
//! 2. Config - accept the validated blueprint and secrets
//! 3. Infrastructure - unlock and mount the encrypted volume
//! 4. System - packages, pinned packages, services, login shell
//! 5. User space - archive, stow, links, clones
//!
//! The first error aborts the run. Nothing is rolled back; running again
//! resumes from wherever the host actually is.

mod stages;

use declarative::{ApplyContext, CommandRunner, Error, ExecuteSummary, Reporter, Result};
use std::path::PathBuf;
use thiserror::Error as ThisError;

use crate::config::Blueprint;
use crate::identity::SessionEvidence;
use crate::paths::SystemPaths;
use crate::secrets::Secrets;
use crate::session::{Session, Stage};
use crate::users::UserDatabase;

/// Everything one run needs, already loaded and validated
#[derive(Debug, Clone)]
pub struct Invocation {
    pub blueprint: Blueprint,
    pub secrets: Secrets,
    pub dotfiles_archive: Option<PathBuf>,
}

/// A failed run: which stage broke, why, and what had been recorded
#[derive(Debug, ThisError)]
#[error("provisioning aborted during {stage} stage: {source}")]
pub struct Abort {
    /// Stage that was being worked towards
    pub stage: Stage,
    #[source]
    pub source: Error,
    pub session: Box<Session>,
}

impl Abort {
    pub fn exit_code(&self) -> i32 {
        self.source.exit_code()
    }
}

/// Host collaborators the engine runs against
pub struct Provisioner<'a> {
    runner: &'a dyn CommandRunner,
    users: &'a dyn UserDatabase,
    evidence: &'a dyn SessionEvidence,
    paths: SystemPaths,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        users: &'a dyn UserDatabase,
        evidence: &'a dyn SessionEvidence,
    ) -> Self {
        Self {
            runner,
            users,
            evidence,
            paths: SystemPaths::default(),
        }
    }

    /// Override the filesystem roots (mapper directory, home root)
    pub fn with_paths(mut self, paths: SystemPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Run every stage in order
    pub fn run(
        &self,
        invocation: &Invocation,
        reporter: &mut dyn Reporter,
    ) -> std::result::Result<Session, Abort> {
        let mut session = Session::new();
        let mut ctx = ApplyContext::new(self.runner, reporter);

        match self.drive(invocation, &mut session, &mut ctx) {
            Ok(()) => Ok(session),
            Err(source) => {
                let stage = session.stage().successor().unwrap_or(Stage::Aborted);
                ctx.reporter.on_abort(stage.name(), &source);
                if let Err(e) = session.abort() {
                    log::debug!("{e}");
                }
                Err(Abort {
                    stage,
                    source,
                    session: Box::new(session),
                })
            }
        }
    }

    fn drive(
        &self,
        invocation: &Invocation,
        session: &mut Session,
        ctx: &mut ApplyContext,
    ) -> Result<()> {
        begin(ctx, Stage::IdentityResolved);
        let identity = self.resolve_identity(invocation, ctx)?;
        session.real_user = Some(identity.user.clone());
        session.home = Some(identity.home.clone());
        finish(session, ctx, Stage::IdentityResolved, &identity.summary)?;

        begin(ctx, Stage::ConfigLoaded);
        let config = self.load_config(invocation)?;
        session.mapper_name = Some(config.mapper_name.clone());
        session.mount_point = Some(config.mount_point.clone());
        session.dotfiles_archive = config.dotfiles_archive.clone();
        finish(session, ctx, Stage::ConfigLoaded, &ExecuteSummary::default())?;

        begin(ctx, Stage::InfrastructureReady);
        let infra = self.prepare_infrastructure(invocation, &config, ctx)?;
        session.unlocked = infra.unlocked;
        session.mounted = infra.mounted;
        finish(session, ctx, Stage::InfrastructureReady, &infra.summary)?;

        begin(ctx, Stage::SystemStateReady);
        let system = self.configure_system(invocation, ctx)?;
        finish(session, ctx, Stage::SystemStateReady, &system)?;

        begin(ctx, Stage::UserSpaceReady);
        let userspace = self.restore_user_space(
            invocation,
            &identity.user,
            &identity.home,
            config.dotfiles_archive.as_deref(),
            ctx,
        )?;
        session.stow_source = Some(userspace.stow_source);
        session.stow_target = Some(userspace.stow_target);
        finish(session, ctx, Stage::UserSpaceReady, &userspace.summary)?;

        session
            .advance(Stage::Complete, 0)
            .map_err(|e| Error::state("session", e.to_string()))
    }
}

fn begin(ctx: &mut ApplyContext, stage: Stage) {
    ctx.reporter.on_stage_start(stage.name());
}

fn finish(
    session: &mut Session,
    ctx: &mut ApplyContext,
    stage: Stage,
    summary: &ExecuteSummary,
) -> Result<()> {
    ctx.reporter.on_stage_complete(stage.name(), summary);
    session
        .advance(stage, summary.total_changes())
        .map_err(|e| Error::state("session", e.to_string()))
}
