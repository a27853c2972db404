use serde::{Deserialize, Serialize};

/// Client-visible phase of the submit → analyze → review → transform flow.
///
/// Stages only move forward, one step at a time. The single exception is the
/// revert to `Idle` when the creation step (project creation or the analysis
/// trigger that follows it) fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Idle,
    Creating,
    Analyzing,
    Review,
    Transforming,
    Completed,
}

pub const ALL_STAGES: [Stage; 6] = [
    Stage::Idle,
    Stage::Creating,
    Stage::Analyzing,
    Stage::Review,
    Stage::Transforming,
    Stage::Completed,
];

impl Stage {
    pub fn index(self) -> usize {
        ALL_STAGES
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    pub fn next(self) -> Option<Stage> {
        ALL_STAGES.get(self.index() + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Completed
    }

    /// Whether `self → to` is a legal transition.
    pub fn can_transition_to(self, to: Stage) -> bool {
        if self.next() == Some(to) {
            return true;
        }
        to == Stage::Idle && matches!(self, Stage::Creating | Stage::Analyzing)
    }

    /// Progress of a displayed step relative to the current stage.
    pub fn step_state(self, step: Stage) -> StepState {
        if self == step {
            StepState::Active
        } else if self.index() > step.index() {
            StepState::Done
        } else {
            StepState::Pending
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Creating => "creating",
            Stage::Analyzing => "analyzing",
            Stage::Review => "review",
            Stage::Transforming => "transforming",
            Stage::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Active,
    Done,
}
