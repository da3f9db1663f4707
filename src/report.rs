//! Terminal and log output for a provisioning run

use declarative::{ApplyResult, Error, ExecuteSummary, Reporter};

use crate::ui;

/// Stages shown to the operator, in run order
const STAGES: [(&str, &str); 5] = [
    ("identity", "Resolving identity"),
    ("config", "Loading configuration"),
    ("infrastructure", "Setting up infrastructure"),
    ("system", "Configuring system state"),
    ("userspace", "Restoring user space"),
];

/// Step number and title for a stage name
fn stage_title(stage: &str) -> Option<(usize, &'static str)> {
    STAGES
        .iter()
        .position(|(name, _)| *name == stage)
        .map(|i| (i + 1, STAGES[i].1))
}

/// Forwards engine events to the `log` facade and colored status lines
pub struct LogReporter {
    quiet: bool,
}

impl LogReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Reporter for LogReporter {
    fn on_stage_start(&mut self, stage: &str) {
        log::info!("Stage started: {stage}");
        if self.quiet {
            return;
        }
        match stage_title(stage) {
            Some((num, title)) => ui::step(num, STAGES.len(), title),
            None => ui::info(stage),
        }
    }

    fn on_resource_start(&mut self, kind: &str, id: &str, description: &str) {
        log::debug!("[{id}] {kind}: {description}");
    }

    fn on_detail(&mut self, id: &str, message: &str) {
        log::info!("[{id}] {message}");
    }

    fn on_warning(&mut self, message: &str) {
        log::warn!("{message}");
        if !self.quiet {
            ui::warn(message);
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        log::debug!("[{id}] {result:?}");
        if self.quiet {
            return;
        }
        match result {
            ApplyResult::Created => ui::success(&format!("{id} created")),
            ApplyResult::Modified => ui::success(&format!("{id} updated")),
            ApplyResult::NoChange => ui::dim(&format!("{id} up to date")),
            ApplyResult::Skipped { reason } => ui::dim(&format!("{id} skipped: {reason}")),
        }
    }

    fn on_stage_complete(&mut self, stage: &str, summary: &ExecuteSummary) {
        log::info!(
            "Stage {stage} complete: {} of {}",
            ui::plural(summary.total_changes(), "change"),
            ui::plural(summary.total(), "resource")
        );
    }

    fn on_abort(&mut self, stage: &str, error: &Error) {
        log::error!("Aborted during {stage}: {error}");
        ui::error(&format!("Aborted during {stage}: {error}"));
        let category = error.category();
        ui::dim(&format!("{}. {}", category.description(), category.advice()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Stage;

    #[test]
    fn test_every_working_stage_has_a_title() {
        let stages = [
            Stage::IdentityResolved,
            Stage::ConfigLoaded,
            Stage::InfrastructureReady,
            Stage::SystemStateReady,
            Stage::UserSpaceReady,
        ];
        for (i, stage) in stages.into_iter().enumerate() {
            assert_eq!(stage_title(stage.name()).map(|(n, _)| n), Some(i + 1));
        }
        assert_eq!(stage_title("complete"), None);
    }
}
