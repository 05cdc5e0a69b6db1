pub mod model;
pub mod orchestrator;
pub mod progress;
pub mod runner;
pub mod state;

pub use model::{LazyModel, ModelLoader, Preloaded, Unavailable};
pub use orchestrator::Orchestrator;
pub use progress::{EventEmitter, PipelineEvent, ProgressEvent, RunOutcome};
pub use runner::{PipelineHandle, PipelineRunner};
pub use state::PipelineState;
