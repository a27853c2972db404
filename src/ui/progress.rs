use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ui::icons::{CHECK, CROSS};
use crate::workflow::{Stage, WorkflowEvent};

/// Spinner that follows a workflow session.
///
/// Log lines are printed above the spinner as they arrive; the spinner message
/// tracks the current stage. Clones share the same spinner.
#[derive(Clone)]
pub struct WorkflowUI {
    bar: ProgressBar,
}

impl WorkflowUI {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {prefix:.bold.dim} {msg} {elapsed:.dim}")
                .expect("progress bar template is a valid static string"),
        );
        bar.set_prefix("futureproof");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// A spinner that draws nothing, for non-terminal output and tests.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn stage_changed(&self, stage: Stage) {
        self.bar.set_message(stage_message(stage));
    }

    /// Print a line above the spinner.
    pub fn print_line(&self, msg: impl AsRef<str>) {
        self.bar.println(msg.as_ref());
    }

    pub fn handle(&self, event: &WorkflowEvent) {
        match event {
            WorkflowEvent::StageChanged { to, .. } => self.stage_changed(*to),
            WorkflowEvent::Logged(entry) => {
                let line = if entry.message.starts_with("Error") {
                    format!("  {}{}", CROSS, style(entry).red())
                } else {
                    format!("  {}", style(entry).dim())
                };
                self.print_line(line);
            }
        }
    }

    /// Consume `events` on a background task until `stop` fires or the
    /// sender goes away. Events already queued when `stop` fires are still shown.
    pub fn follow(
        &self,
        mut events: broadcast::Receiver<WorkflowEvent>,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        let ui = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = events.recv() => match received {
                        Ok(event) => ui.handle(&event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "Progress display lagged behind workflow events");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
        })
    }

    pub fn finish(&self, msg: impl AsRef<str>) {
        self.bar
            .finish_with_message(format!("{}{}", CHECK, msg.as_ref()));
    }

    pub fn fail(&self, msg: impl AsRef<str>) {
        self.bar.abandon_with_message(format!(
            "{}{}",
            CROSS,
            style(msg.as_ref()).red()
        ));
    }

    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bar.suspend(f)
    }
}

impl Default for WorkflowUI {
    /// Animated spinner on a terminal, hidden otherwise.
    fn default() -> Self {
        if console::Term::stderr().is_term() {
            Self::new()
        } else {
            Self::hidden()
        }
    }
}

fn stage_message(stage: Stage) -> String {
    match stage {
        Stage::Idle => "Waiting for a repository".to_string(),
        Stage::Creating => "Connecting repository...".to_string(),
        Stage::Analyzing => format!("{}", style("Analyzing code...").cyan()),
        Stage::Review => "Analysis ready for review".to_string(),
        Stage::Transforming => format!("{}", style("Transforming...").yellow()),
        Stage::Completed => "Transformation complete".to_string(),
    }
}
