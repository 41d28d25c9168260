//! Build swif2 workflow descriptions for Hall C replays and batch commands.
//!
//! Pipeline: run/command specs -> job builders -> common scheduling fields ->
//! workflow document.

pub mod config;
pub mod job;
pub mod mode;
pub mod render;
pub mod runs;
pub mod workflow;

pub type Result<T> = anyhow::Result<T>;

pub use config::Settings;
pub use workflow::{JobRequest, Workflow, WorkflowRequest, build_workflow};
