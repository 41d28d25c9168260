//! Job descriptors and the builders that produce them.
//!
//! JSON shape of one job (keys are written sorted):
//! {
//!   "name": "hcswif202403050907_nps_coin_1234",
//!   "command": ["/path/hcswif2.sh SCRIPTS/... 1234 -1 2"],
//!   "inputs": [{ "local": "nps_replay.tar.gz", "remote": "/group/..." }],
//!   "outputs": [{ "local": "ROOTfiles/...", "remote": "/mss/..." }],   // optional
//!   "disk_bytes": 41000000000,
//!   "ram_bytes": 2500000000,
//!   "cpu_cores": 1,
//!   "time_secs": 14400,                                                // optional
//!   "account": "hallc",
//!   "constraint": "el9",
//!   "partition": "production",
//!   "stdout": "/farm_out/.../name.out",
//!   "stderr": "/farm_out/.../name.err"
//! }

pub mod command;
pub mod common;
pub mod replay;

pub use command::{CommandJobs, FileList, build_command_jobs};
pub use common::{CommonInfo, merge_common_info, resolve_account, resolve_constraint};
pub use replay::{DriverShell, EventLimit, ReplayJobs, build_replay_job, build_replay_jobs};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One file staged into or out of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMapping {
    #[serde(rename = "local")]
    pub local_name: String,
    #[serde(rename = "remote")]
    pub remote_path: String,
}

impl FileMapping {
    pub fn new(local_name: impl Into<String>, remote_path: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            remote_path: remote_path.into(),
        }
    }

    /// Map a remote file to its own base name.
    pub fn from_remote(remote_path: impl AsRef<Path>) -> Self {
        let remote_path = remote_path.as_ref();
        let local_name = remote_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(local_name, remote_path.to_string_lossy())
    }
}

/// A single job of a workflow.
///
/// Builders fill in the job-specific fields; the workflow-wide scheduling
/// fields stay `None` until [`merge_common_info`] runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub name: String,
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<FileMapping>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<FileMapping>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl JobDescriptor {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: vec![command.into()],
            inputs: None,
            outputs: None,
            disk_bytes: None,
            ram_bytes: None,
            cpu_cores: None,
            time_secs: None,
            account: None,
            constraint: None,
            partition: None,
            stdout: None,
            stderr: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<FileMapping>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<FileMapping>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    pub fn with_disk_bytes(mut self, disk_bytes: u64) -> Self {
        self.disk_bytes = Some(disk_bytes);
        self
    }
}

/// Warn (and carry on) when a file a job depends on is not there.
pub(crate) fn warn_if_missing(path: &Path, what: &str) {
    if !path.is_file() {
        tracing::warn!("{}: {} does not exist", what, path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Log sink that keeps everything written to it.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_warnings(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn missing_file_is_reported() {
        let logs = capture_warnings(|| {
            warn_if_missing(Path::new("/nonexistent/nps_coin_0042.dat.0"), "RAW DATA")
        });
        assert!(logs.contains("WARN"), "{}", logs);
        assert!(
            logs.contains("RAW DATA: /nonexistent/nps_coin_0042.dat.0 does not exist"),
            "{}",
            logs
        );
    }

    #[test]
    fn present_file_is_quiet() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let logs = capture_warnings(|| warn_if_missing(file.path(), "RAW DATA"));
        assert_eq!(logs, "");
    }

    #[test]
    fn file_list_warns_for_each_missing_input() {
        let list = FileList::parse("PATTERN 1\n/nonexistent/run_{param}.dat\n/nonexistent/run_{param}.log\n")
            .unwrap();
        let logs = capture_warnings(|| {
            let inputs = list.inputs_for("./ana.sh 77").unwrap();
            assert_eq!(inputs.len(), 2);
        });
        assert!(logs.contains("/nonexistent/run_77.dat does not exist"), "{}", logs);
        assert!(logs.contains("/nonexistent/run_77.log does not exist"), "{}", logs);
    }

    #[test]
    fn mapping_uses_base_name() {
        let m = FileMapping::from_remote("/mss/hallc/c-nps/raw/nps_coin_1234.dat.0");
        assert_eq!(m, FileMapping::new("nps_coin_1234.dat.0", "/mss/hallc/c-nps/raw/nps_coin_1234.dat.0"));
    }

    #[test]
    fn mapping_serializes_with_scheduler_keys() {
        let m = FileMapping::new("a.root", "/mss/a.root");
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v, serde_json::json!({"local": "a.root", "remote": "/mss/a.root"}));
    }

    #[test]
    fn fresh_job_omits_unset_fields() {
        let job = JobDescriptor::new("wf_job0", "echo hi");
        let v = serde_json::to_value(&job).unwrap();
        assert_eq!(v, serde_json::json!({"name": "wf_job0", "command": ["echo hi"]}));
    }
}
