pub mod config;
pub mod constants;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod logging;
pub mod models;
pub mod organizer;
pub mod pipeline;
pub mod scanner;
pub mod utils;

pub use config::Config;
pub use embeddings::EmbeddingProvider;
pub use error::PipelineError;
pub use llm::LlmProvider;
pub use models::{FileMeta, FileRecord, SortMode};
pub use organizer::{OrganizationPlan, PreviewTree};
pub use pipeline::{Orchestrator, PipelineEvent, PipelineRunner, PipelineState, RunOutcome};
