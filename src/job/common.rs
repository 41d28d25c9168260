//! Workflow-wide scheduling fields applied to every job.

use crate::config::{FALLBACK_ACCOUNT, Settings};
use crate::job::JobDescriptor;
use anyhow::bail;
use std::path::PathBuf;
use tracing::warn;

/// Slurm feature requested when the user gives none.
pub const DEFAULT_CONSTRAINT: &str = "el9";

pub const PARTITION: &str = "production";

/// Join user constraints with commas, or fall back to [`DEFAULT_CONSTRAINT`].
/// Values are passed through unchecked.
pub fn resolve_constraint(values: &[String]) -> String {
    if values.is_empty() {
        DEFAULT_CONSTRAINT.to_string()
    } else {
        values.join(",")
    }
}

/// Use the given account, or ask `confirm` whether the fallback account is
/// acceptable.
pub fn resolve_account<F>(explicit: Option<&str>, confirm: F) -> anyhow::Result<String>
where
    F: FnOnce(&str) -> anyhow::Result<bool>,
{
    if let Some(account) = explicit {
        return Ok(account.to_string());
    }

    warn!("no account specified");
    if confirm(FALLBACK_ACCOUNT)? {
        Ok(FALLBACK_ACCOUNT.to_string())
    } else {
        bail!("no account: please specify one with --account")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonInfo {
    pub account: String,
    pub ram_bytes: u64,
    pub cpu_cores: u32,
    /// `None` leaves the limit to the scheduler.
    pub time_secs: Option<u64>,
    pub constraint: String,
    pub partition: String,
    pub stdout_dir: PathBuf,
    pub stderr_dir: PathBuf,
}

impl CommonInfo {
    /// Defaults from `settings`; override fields as needed.
    pub fn new(account: impl Into<String>, settings: &Settings) -> Self {
        Self {
            account: account.into(),
            ram_bytes: settings.resources.ram_bytes,
            cpu_cores: settings.resources.cpu_cores,
            time_secs: None,
            constraint: DEFAULT_CONSTRAINT.to_string(),
            partition: PARTITION.to_string(),
            stdout_dir: settings.dirs.stdout_dir.clone(),
            stderr_dir: settings.dirs.stderr_dir.clone(),
        }
    }
}

/// Return copies of `jobs`, in order, with the common fields filled in.
pub fn merge_common_info(jobs: &[JobDescriptor], info: &CommonInfo) -> Vec<JobDescriptor> {
    jobs.iter()
        .map(|job| {
            let stdout = info.stdout_dir.join(format!("{}.out", job.name));
            let stderr = info.stderr_dir.join(format!("{}.err", job.name));
            JobDescriptor {
                account: Some(info.account.clone()),
                ram_bytes: Some(info.ram_bytes),
                cpu_cores: Some(info.cpu_cores),
                time_secs: info.time_secs,
                constraint: Some(info.constraint.clone()),
                partition: Some(info.partition.clone()),
                stdout: Some(stdout.to_string_lossy().into_owned()),
                stderr: Some(stderr.to_string_lossy().into_owned()),
                ..job.clone()
            }
        })
        .collect()
}
