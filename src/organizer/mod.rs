pub mod bucket;
pub mod cluster;
pub mod generator;
pub mod keywords;
pub mod labeler;
pub mod mover;
pub mod plan;
pub mod preview;

pub use cluster::{Cluster, ClusterEngine};
pub use generator::NameRegistry;
pub use labeler::{Label, Labeler};
pub use mover::{ApplyPlan, ApplyReport, FileMover};
pub use plan::{OrganizationPlan, PlanBuilder, PlanEntry, PlanOrigin, RunStats};
pub use preview::PreviewTree;
