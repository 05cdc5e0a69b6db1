use serde::Serialize;
use std::fmt;

/// Lifecycle of one organizing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineState {
    Idle,
    Scanning,
    Extracting,
    Embedding,
    Clustering,
    Labeling,
    PlanReady,
    Applying,
    Done,
    Cancelled,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Done | PipelineState::Cancelled | PipelineState::Failed
        )
    }

    /// Position in the forward sequence; terminal-only states have none
    fn rank(self) -> Option<u8> {
        match self {
            PipelineState::Idle => Some(0),
            PipelineState::Scanning => Some(1),
            PipelineState::Extracting => Some(2),
            PipelineState::Embedding => Some(3),
            PipelineState::Clustering => Some(4),
            PipelineState::Labeling => Some(5),
            PipelineState::PlanReady => Some(6),
            PipelineState::Applying => Some(7),
            PipelineState::Done => Some(8),
            PipelineState::Cancelled | PipelineState::Failed => None,
        }
    }

    /// Whether the machine may move from `self` to `next`
    ///
    /// Stages only move forward (the metadata modes skip the semantic
    /// ones); `Applying` needs a plan and `Done` needs `Applying`.
    /// `Cancelled` and `Failed` are reachable from every non-terminal state.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            PipelineState::Cancelled | PipelineState::Failed => true,
            PipelineState::Applying => self == PipelineState::PlanReady,
            PipelineState::Done => self == PipelineState::Applying,
            _ => match (self.rank(), next.rank()) {
                (Some(from), Some(to)) => to > from && self != PipelineState::PlanReady,
                _ => false,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Scanning => "scanning",
            PipelineState::Extracting => "extracting",
            PipelineState::Embedding => "embedding",
            PipelineState::Clustering => "clustering",
            PipelineState::Labeling => "labeling",
            PipelineState::PlanReady => "plan-ready",
            PipelineState::Applying => "applying",
            PipelineState::Done => "done",
            PipelineState::Cancelled => "cancelled",
            PipelineState::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
