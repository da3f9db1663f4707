//! Apply context and provider traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific process executor or logging sink.

use crate::command::CommandSpec;
use crate::error::{Error, Result};
use crate::types::{ApplyResult, CommandOutput, ExecuteSummary};

/// Executor for external commands
///
/// Resources never spawn processes themselves. Every external command
/// goes through a runner, split by phase:
///
/// - [`probe`](Self::probe) is the side-effect-free check phase. The output is
///   returned whatever the exit status; only a spawn failure is an error.
/// - [`act`](Self::act) mutates the host. A non-zero exit is an error.
pub trait CommandRunner {
    /// Run a read-only query command
    fn probe(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run a mutating command
    fn act(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run a query command and return just success/failure
    fn probe_status(&self, spec: &CommandSpec) -> Result<bool> {
        Ok(self.probe(spec)?.success)
    }
}

/// Receiver of semantic events emitted while reconciling
///
/// Implement this trait to route events to a logger, a terminal UI or a
/// test recorder.
pub trait Reporter {
    /// Called when a stage begins
    fn on_stage_start(&mut self, stage: &str);

    /// Called when starting to apply a single resource of the given kind
    fn on_resource_start(&mut self, kind: &str, id: &str, description: &str);

    /// Progress note from inside a resource
    fn on_detail(&mut self, id: &str, message: &str);

    /// Something worth the operator's attention that does not abort the run
    fn on_warning(&mut self, message: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called when a stage completes
    fn on_stage_complete(&mut self, stage: &str, summary: &ExecuteSummary);

    /// Called once when the run is aborted
    fn on_abort(&mut self, stage: &str, error: &Error);
}

/// An event captured by [`Recorder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StageStart(String),
    /// Resource kind and id
    ResourceStart(String, String),
    Detail(String, String),
    Warning(String),
    ResourceComplete(String, ApplyResult),
    StageComplete(String),
    Abort(String, String),
}

/// Reporter that keeps every event in memory
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages that were started, in order
    pub fn stages(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::StageStart(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Warnings emitted, in order
    pub fn warnings(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Warning(w) => Some(w.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for Recorder {
    fn on_stage_start(&mut self, stage: &str) {
        self.events.push(Event::StageStart(stage.to_string()));
    }

    fn on_resource_start(&mut self, kind: &str, id: &str, _description: &str) {
        self.events
            .push(Event::ResourceStart(kind.to_string(), id.to_string()));
    }

    fn on_detail(&mut self, id: &str, message: &str) {
        self.events
            .push(Event::Detail(id.to_string(), message.to_string()));
    }

    fn on_warning(&mut self, message: &str) {
        self.events.push(Event::Warning(message.to_string()));
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        self.events
            .push(Event::ResourceComplete(id.to_string(), result.clone()));
    }

    fn on_stage_complete(&mut self, stage: &str, _summary: &ExecuteSummary) {
        self.events.push(Event::StageComplete(stage.to_string()));
    }

    fn on_abort(&mut self, stage: &str, error: &Error) {
        self.events
            .push(Event::Abort(stage.to_string(), error.to_string()));
    }
}

/// Context passed to resource check and apply operations
pub struct ApplyContext<'a> {
    /// Executor for every external command
    pub runner: &'a dyn CommandRunner,
    /// Event sink
    pub reporter: &'a mut dyn Reporter,
    /// Identifier of the resource currently being applied
    resource_id: String,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context
    pub fn new(runner: &'a dyn CommandRunner, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            runner,
            reporter,
            resource_id: String::new(),
        }
    }

    /// Mark which resource subsequent details belong to
    pub fn enter(&mut self, resource_id: String) {
        self.resource_id = resource_id;
    }

    /// Emit a progress note for the current resource
    pub fn detail(&mut self, message: impl AsRef<str>) {
        self.reporter.on_detail(&self.resource_id, message.as_ref());
    }

    /// Emit a non-fatal warning
    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.reporter.on_warning(message.as_ref());
    }
}
