//! Run-scoped session state
//!
//! A [`Session`] lives for exactly one provisioning run. It tracks which
//! stage the run has reached and the values stages derived along the way.
//! It is never persisted.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::identity::RealUser;

/// Provisioning stages, in the only order they may be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    IdentityResolved,
    ConfigLoaded,
    InfrastructureReady,
    SystemStateReady,
    UserSpaceReady,
    Complete,
    Aborted,
}

impl Stage {
    /// The stage that legally follows this one on success
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::IdentityResolved),
            Self::IdentityResolved => Some(Self::ConfigLoaded),
            Self::ConfigLoaded => Some(Self::InfrastructureReady),
            Self::InfrastructureReady => Some(Self::SystemStateReady),
            Self::SystemStateReady => Some(Self::UserSpaceReady),
            Self::UserSpaceReady => Some(Self::Complete),
            Self::Complete | Self::Aborted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Aborted)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::IdentityResolved => "identity",
            Self::ConfigLoaded => "config",
            Self::InfrastructureReady => "infrastructure",
            Self::SystemStateReady => "system",
            Self::UserSpaceReady => "userspace",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal stage transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: Stage,
    pub to: Stage,
}

/// One recorded stage change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Stage,
    pub to: Stage,
    pub at: DateTime<Utc>,
    /// Resources changed while getting here
    pub changes: usize,
}

/// State of one provisioning run
#[derive(Debug, Clone)]
pub struct Session {
    pub real_user: Option<RealUser>,
    pub home: Option<PathBuf>,

    pub mapper_name: Option<String>,
    pub mount_point: Option<PathBuf>,
    pub unlocked: bool,
    pub mounted: bool,

    pub stow_source: Option<PathBuf>,
    pub stow_target: Option<PathBuf>,
    pub dotfiles_archive: Option<PathBuf>,

    stage: Stage,
    started_at: DateTime<Utc>,
    history: Vec<Transition>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            real_user: None,
            home: None,
            mapper_name: None,
            mount_point: None,
            unlocked: false,
            mounted: false,
            stow_source: None,
            stow_target: None,
            dotfiles_archive: None,
            stage: Stage::Start,
            started_at: Utc::now(),
            history: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Total resources changed across all completed stages
    pub fn total_changes(&self) -> usize {
        self.history.iter().map(|t| t.changes).sum()
    }

    /// Move to the next stage. Only the immediate successor is accepted.
    pub fn advance(&mut self, to: Stage, changes: usize) -> Result<(), TransitionError> {
        if self.stage.successor() != Some(to) {
            return Err(TransitionError {
                from: self.stage,
                to,
            });
        }
        self.record(to, changes);
        Ok(())
    }

    /// Move to `Aborted`. Terminal sessions cannot be aborted.
    pub fn abort(&mut self) -> Result<(), TransitionError> {
        if self.stage.is_terminal() {
            return Err(TransitionError {
                from: self.stage,
                to: Stage::Aborted,
            });
        }
        self.record(Stage::Aborted, 0);
        Ok(())
    }

    fn record(&mut self, to: Stage, changes: usize) {
        log::trace!("stage {} -> {to}", self.stage);
        self.history.push(Transition {
            from: self.stage,
            to,
            at: Utc::now(),
            changes,
        });
        self.stage = to;
    }
}
