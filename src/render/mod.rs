//! Output rendering.

pub mod json;

pub use json::{render_workflow_json, write_workflow};
