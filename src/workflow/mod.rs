//! Dashboard workflow: submit a repository, analyze, review, transform, download.
//!
//! - `stage`: the six-stage status machine and its legal transitions
//! - `log`: the append-only session log
//! - `backend`: the backend calls the workflow needs, as a trait
//! - `runner`: [`Workflow`], which drives a session through the stages

pub mod backend;
pub mod log;
pub mod runner;
pub mod stage;

pub use backend::DashboardBackend;
pub use log::{LogEntry, WorkflowLog};
pub use runner::{Workflow, WorkflowEvent, WorkflowOptions, WorkflowSnapshot};
pub use stage::{ALL_STAGES, Stage, StepState};
