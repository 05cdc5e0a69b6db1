use crate::error::PipelineError;
use crate::organizer::{ApplyReport, OrganizationPlan};
use crate::pipeline::state::PipelineState;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Unit-level progress within a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: PipelineState,
    /// Increases with every completed unit of the stage
    pub completed: usize,
    pub total: usize,
    pub message: Option<String>,
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    PlanReady(OrganizationPlan),
    /// The plan was handed to the apply sink
    Applied {
        plan: OrganizationPlan,
        report: ApplyReport,
    },
    Cancelled,
    Failed {
        /// Stable reason, e.g. `embedding-model-unavailable`
        reason: String,
        message: String,
    },
}

impl RunOutcome {
    pub fn failed(err: &PipelineError) -> Self {
        RunOutcome::Failed {
            reason: err.reason().to_string(),
            message: err.to_string(),
        }
    }

    pub fn plan(&self) -> Option<&OrganizationPlan> {
        match self {
            RunOutcome::PlanReady(plan) | RunOutcome::Applied { plan, .. } => Some(plan),
            RunOutcome::Cancelled | RunOutcome::Failed { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled)
    }
}

/// Everything an observer receives from a running pipeline
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StateChanged {
        from: PipelineState,
        to: PipelineState,
    },
    Progress(ProgressEvent),
    /// A per-file or per-cluster problem that the run absorbed
    Warning {
        path: Option<PathBuf>,
        message: String,
    },
    /// Always the last event of a run
    Finished(RunOutcome),
}

/// Sending half of the event channel plus the current state
pub struct EventEmitter {
    tx: mpsc::Sender<PipelineEvent>,
    state: PipelineState,
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self {
            tx,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub async fn transition(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::Internal(format!(
                "invalid state transition {} -> {}",
                self.state, next
            )));
        }
        let from = std::mem::replace(&mut self.state, next);
        info!("Pipeline: {} -> {}", from, next);
        self.send(PipelineEvent::StateChanged { from, to: next }).await;
        Ok(())
    }

    pub async fn progress(&self, completed: usize, total: usize, message: Option<String>) {
        self.send(PipelineEvent::Progress(ProgressEvent {
            stage: self.state,
            completed,
            total,
            message,
        }))
        .await;
    }

    pub async fn warning(&self, path: Option<&Path>, message: impl Into<String>) {
        self.send(PipelineEvent::Warning {
            path: path.map(Path::to_path_buf),
            message: message.into(),
        })
        .await;
    }

    pub async fn finish(&self, outcome: RunOutcome) {
        self.send(PipelineEvent::Finished(outcome)).await;
    }

    /// Waits for channel capacity; an observer that went away is not an error
    async fn send(&self, event: PipelineEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}
