//! Workflow assembly: build the jobs, apply the common fields, and name the
//! output document.

use crate::config::Settings;
use crate::job::{
    CommandJobs, CommonInfo, JobDescriptor, ReplayJobs, build_command_jobs, build_replay_jobs,
    merge_common_info, resolve_account, resolve_constraint,
};
use crate::runs::parse_run_spec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// The document handed to the batch scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub jobs: Vec<JobDescriptor>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, jobs: Vec<JobDescriptor>) -> Self {
        Self {
            name: name.into(),
            jobs,
        }
    }

    /// `<json_dir>/<name>.json`
    pub fn output_path(&self, json_dir: &Path) -> PathBuf {
        json_dir.join(format!("{}.json", self.name))
    }
}

/// What kind of jobs to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    Replay {
        /// Raw `--run` tokens.
        runs: Vec<String>,
        replay: ReplayJobs,
    },
    Command(CommandJobs),
}

/// Everything the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRequest {
    pub name: Option<String>,
    pub jobs: JobRequest,
    pub account: Option<String>,
    /// Disk size for runs listed without one.
    pub disk_bytes: Option<u64>,
    pub ram_bytes: Option<u64>,
    pub cpu_cores: Option<u32>,
    pub time_secs: Option<u64>,
    pub constraints: Vec<String>,
}

impl WorkflowRequest {
    pub fn new(jobs: JobRequest) -> Self {
        Self {
            name: None,
            jobs,
            account: None,
            disk_bytes: None,
            ram_bytes: None,
            cpu_cores: None,
            time_secs: None,
            constraints: Vec::new(),
        }
    }
}

/// Build the complete workflow and the path it should be written to.
///
/// `confirm_account` is asked whether to use the fallback account when the
/// request has none. Nothing is written here.
pub fn build_workflow<F>(
    request: &WorkflowRequest,
    settings: &Settings,
    confirm_account: F,
) -> anyhow::Result<(Workflow, PathBuf)>
where
    F: FnOnce(&str) -> anyhow::Result<bool>,
{
    let name = request
        .name
        .clone()
        .unwrap_or_else(|| settings.default_workflow_name());

    let jobs = match &request.jobs {
        JobRequest::Replay { runs, replay } => {
            let disk = request
                .disk_bytes
                .unwrap_or(settings.resources.run_disk_bytes);
            let runs = parse_run_spec(runs, disk)?;
            build_replay_jobs(replay, &runs, &name, settings)?
        }
        JobRequest::Command(command) => build_command_jobs(command, &name)?,
    };

    let account = resolve_account(request.account.as_deref(), confirm_account)?;

    let mut common = CommonInfo::new(account, settings);
    if let Some(ram) = request.ram_bytes {
        common.ram_bytes = ram;
    }
    if let Some(cpu) = request.cpu_cores {
        common.cpu_cores = cpu;
    }
    common.time_secs = request.time_secs;
    common.constraint = resolve_constraint(&request.constraints);

    let workflow = Workflow::new(name, merge_common_info(&jobs, &common));
    let path = workflow.output_path(&settings.dirs.json_dir);
    info!(workflow = %workflow.name, jobs = workflow.jobs.len(), "built workflow");

    Ok((workflow, path))
}
