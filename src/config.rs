//! Settings shared by every stage of workflow construction.
//!
//! Everything that depends on the environment (who is running, when, and
//! where things live) is captured here once, so the builders themselves are
//! deterministic.

use anyhow::Context;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Account offered when none is given on the command line.
pub const FALLBACK_ACCOUNT: &str = "hallc";

/// Prefix of generated workflow names.
pub const WORKFLOW_PREFIX: &str = "hcswif";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRoots {
    pub stdout_dir: PathBuf,
    pub stderr_dir: PathBuf,
    pub json_dir: PathBuf,
    /// Long-term storage root that replay output is written to.
    pub tape_out: PathBuf,
    pub raw_dir: PathBuf,
    /// Directory holding the hcswif driver scripts.
    pub script_dir: PathBuf,
    /// Replay tarball staged into every replay job.
    pub replay_archive: PathBuf,
}

impl DirectoryRoots {
    pub fn for_user(user: &str, script_dir: impl Into<PathBuf>) -> Self {
        Self {
            stdout_dir: Path::new("/farm_out/").join(user).join("nps_replay_stdout/"),
            stderr_dir: Path::new("/farm_out/").join(user).join("nps_replay_stderr/"),
            json_dir: Path::new("/group/nps/").join(user).join("hcswif/jsons"),
            tape_out: PathBuf::from("/mss/hallc/c-nps/analysis/online/replays/"),
            raw_dir: PathBuf::from("/mss/hallc/c-nps/raw"),
            script_dir: script_dir.into(),
            replay_archive: Path::new("/group/nps/").join(user).join("nps_replay.tar.gz"),
        }
    }
}

/// Coarse disk requests for replay jobs. These are over-provisioning
/// estimates, not byte counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskHeuristics {
    /// Room for the unpacked replay.
    pub base_bytes: u64,
    /// Per staged raw-data file in single-segment jobs.
    pub per_file_bytes: u64,
    /// Per segment index in all-segments jobs.
    pub per_segment_bytes: u64,
    pub all_segments_base_bytes: u64,
}

impl Default for DiskHeuristics {
    fn default() -> Self {
        Self {
            base_bytes: 1_000_000_000,
            per_file_bytes: 20_000_000_000,
            per_segment_bytes: 20_000_000_000,
            all_segments_base_bytes: 30_000_000_000,
        }
    }
}

impl DiskHeuristics {
    /// Single-segment job staging `files` raw-data files.
    pub fn segment_budget(&self, files: u64) -> anyhow::Result<u64> {
        self.per_file_bytes
            .checked_mul(files)
            .and_then(|b| b.checked_add(self.base_bytes))
            .with_context(|| format!("disk budget for {} staged files overflows u64", files))
    }

    /// All-segments job whose last segment is `last_segment`.
    pub fn all_segments_budget(&self, last_segment: u32) -> anyhow::Result<u64> {
        self.per_segment_bytes
            .checked_mul(u64::from(last_segment))
            .and_then(|b| b.checked_add(self.all_segments_base_bytes))
            .with_context(|| {
                format!("disk budget for segments 0..={} overflows u64", last_segment)
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDefaults {
    pub ram_bytes: u64,
    pub cpu_cores: u32,
    /// Disk size recorded for runs that do not carry one.
    pub run_disk_bytes: u64,
}

impl Default for ResourceDefaults {
    fn default() -> Self {
        Self {
            ram_bytes: 2_500_000_000,
            cpu_cores: 1,
            run_disk_bytes: 10_000_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub now: NaiveDateTime,
    pub user: String,
    pub dirs: DirectoryRoots,
    pub resources: ResourceDefaults,
    pub disk: DiskHeuristics,
    /// Put the segment number into replay job names.
    pub segment_in_job_name: bool,
}

impl Settings {
    pub fn new(user: impl Into<String>, now: NaiveDateTime, script_dir: impl Into<PathBuf>) -> Self {
        let user = user.into();
        Self {
            dirs: DirectoryRoots::for_user(&user, script_dir),
            now,
            user,
            resources: ResourceDefaults::default(),
            disk: DiskHeuristics::default(),
            segment_in_job_name: false,
        }
    }

    /// `hcswif` + YYYYMMDDhhmm of the current time.
    pub fn default_workflow_name(&self) -> String {
        format!("{}{}", WORKFLOW_PREFIX, self.now.format("%Y%m%d%H%M"))
    }

    /// Warn about output directories that do not exist. Never fails.
    pub fn warn_missing_directories(&self) {
        for (what, dir) in [
            ("std_out", &self.dirs.stdout_dir),
            ("std_err", &self.dirs.stderr_dir),
            ("json_dir", &self.dirs.json_dir),
        ] {
            if !dir.is_dir() {
                warn!("{}: {} does not exist", what, dir.display());
            }
        }
        if !self.dirs.raw_dir.is_dir() {
            warn!("raw_dir: {} does not exist", self.dirs.raw_dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 30)
            .unwrap()
    }

    #[test]
    fn directories_follow_user() {
        let dirs = DirectoryRoots::for_user("jdoe", "/opt/hcswif");
        assert_eq!(dirs.stdout_dir, PathBuf::from("/farm_out/jdoe/nps_replay_stdout/"));
        assert_eq!(dirs.stderr_dir, PathBuf::from("/farm_out/jdoe/nps_replay_stderr/"));
        assert_eq!(dirs.json_dir, PathBuf::from("/group/nps/jdoe/hcswif/jsons"));
        assert_eq!(dirs.replay_archive, PathBuf::from("/group/nps/jdoe/nps_replay.tar.gz"));
        assert_eq!(dirs.script_dir, PathBuf::from("/opt/hcswif"));
    }

    #[test]
    fn workflow_name_uses_minute_timestamp() {
        let settings = Settings::new("jdoe", now(), "/opt/hcswif");
        assert_eq!(settings.default_workflow_name(), "hcswif202403050907");
    }

    #[test]
    fn resource_defaults() {
        let r = ResourceDefaults::default();
        assert_eq!(r.ram_bytes, 2_500_000_000);
        assert_eq!(r.cpu_cores, 1);
        assert_eq!(r.run_disk_bytes, 10_000_000_000);
    }

    #[test]
    fn disk_budgets() {
        let d = DiskHeuristics::default();
        assert_eq!(d.segment_budget(2).unwrap(), 41_000_000_000);
        assert_eq!(d.all_segments_budget(0).unwrap(), 30_000_000_000);
        assert_eq!(d.all_segments_budget(3).unwrap(), 90_000_000_000);
    }

    #[test]
    fn disk_budget_overflow_is_an_error() {
        let d = DiskHeuristics::default();
        let err = d.all_segments_budget(1_000_000_000).unwrap_err();
        assert!(err.to_string().contains("overflows"), "{}", err);

        let huge = DiskHeuristics {
            per_file_bytes: u64::MAX / 2 + 1,
            ..DiskHeuristics::default()
        };
        assert!(huge.segment_budget(2).is_err());

        let tight = DiskHeuristics {
            base_bytes: u64::MAX,
            ..DiskHeuristics::default()
        };
        assert!(tight.segment_budget(1).is_err());
    }

    #[test]
    fn all_segments_budget_grows_with_segment() {
        let d = DiskHeuristics::default();
        let budgets: Vec<u64> = (0..20).map(|s| d.all_segments_budget(s).unwrap()).collect();
        assert!(budgets.windows(2).all(|w| w[0] < w[1]));
    }
}
