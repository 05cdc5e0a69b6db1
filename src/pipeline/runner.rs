use crate::error::PipelineError;
use crate::models::SortMode;
use crate::organizer::ApplyPlan;
use crate::pipeline::orchestrator::Orchestrator;
use crate::pipeline::progress::{EventEmitter, PipelineEvent, RunOutcome};
use crate::pipeline::state::PipelineState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Starts runs in the background and optionally applies their plans
pub struct PipelineRunner {
    orchestrator: Arc<Orchestrator>,
    sink: Option<Arc<dyn ApplyPlan>>,
}

impl PipelineRunner {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            sink: None,
        }
    }

    /// Apply every ready plan through `sink` (`Applying` then `Done`)
    pub fn with_sink(mut self, sink: Arc<dyn ApplyPlan>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Start organizing `dir` on the runtime
    ///
    /// The event channel is bounded by `pipeline.event_buffer`, so a slow
    /// observer slows the run down rather than growing a queue.
    pub fn spawn(&self, dir: impl Into<PathBuf>, mode: SortMode) -> PipelineHandle {
        let dir = dir.into();
        let (tx, rx) = mpsc::channel(self.orchestrator.config().pipeline.event_buffer.max(1));
        let cancel = CancellationToken::new();

        let orchestrator = Arc::clone(&self.orchestrator);
        let sink = self.sink.clone();
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            let mut events = EventEmitter::new(tx);
            let outcome = orchestrator.run(&dir, mode, &mut events, &token).await;
            let outcome = match (outcome, sink) {
                (RunOutcome::PlanReady(plan), Some(sink)) => apply(plan, sink.as_ref(), &mut events, &token).await,
                (outcome, _) => outcome,
            };
            events.finish(outcome.clone()).await;
            outcome
        });

        PipelineHandle {
            events: rx,
            cancel,
            join,
        }
    }
}

async fn apply(
    plan: crate::organizer::OrganizationPlan,
    sink: &dyn ApplyPlan,
    events: &mut EventEmitter,
    cancel: &CancellationToken,
) -> RunOutcome {
    // A cancelled run never touches the filesystem
    if cancel.is_cancelled() {
        let _ = events.transition(PipelineState::Cancelled).await;
        return RunOutcome::Cancelled;
    }
    if let Err(e) = events.transition(PipelineState::Applying).await {
        return RunOutcome::failed(&e);
    }
    match sink.apply(&plan).await {
        Ok(report) => {
            info!(
                "Applied plan: {} moved, {} skipped, {} failed",
                report.moved.len(),
                report.skipped.len(),
                report.failed.len()
            );
            if let Err(e) = events.transition(PipelineState::Done).await {
                return RunOutcome::failed(&e);
            }
            RunOutcome::Applied { plan, report }
        }
        Err(e) => {
            let err = PipelineError::Apply(format!("{:#}", e));
            warn!("{}", err);
            let _ = events.transition(PipelineState::Failed).await;
            RunOutcome::failed(&err)
        }
    }
}

/// A run in progress
pub struct PipelineHandle {
    events: mpsc::Receiver<PipelineEvent>,
    cancel: CancellationToken,
    join: JoinHandle<RunOutcome>,
}

impl PipelineHandle {
    /// Request cancellation; in-flight units finish, nothing new starts
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next event, or `None` once the run has finished and the channel drained
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    /// Wait for the outcome, discarding any events not yet received
    pub async fn wait(mut self) -> RunOutcome {
        while self.events.recv().await.is_some() {}
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::failed(&PipelineError::Internal(format!("run task failed: {}", e))),
        }
    }
}
