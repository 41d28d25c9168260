//! Replay-mode jobs: one job per run, staging the replay tarball plus the
//! run's raw-data segments and optionally archiving the ROOT file to tape.

use crate::config::Settings;
use crate::job::{FileMapping, JobDescriptor, warn_if_missing};
use crate::mode::{SpectrometerMode, render_output_name};
use crate::runs::RunRecord;
use anyhow::{Context, bail};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Local name the replay tarball is staged under.
pub const REPLAY_ARCHIVE_LOCAL: &str = "nps_replay.tar.gz";

/// Largest segment number staged by an all-segments job.
pub const MAX_ALL_SEGMENTS: u32 = 10_000;

/// Number of events to replay per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventLimit {
    #[default]
    All,
    Count(u64),
}

impl fmt::Display for EventLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // The driver scripts take -1 to mean every event.
            EventLimit::All => f.write_str("-1"),
            EventLimit::Count(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for EventLimit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") || s == "-1" {
            return Ok(EventLimit::All);
        }
        let n = s
            .parse::<u64>()
            .with_context(|| format!("events must be a count or \"all\", got {:?}", s))?;
        Ok(EventLimit::Count(n))
    }
}

/// Shell flavour of the driver script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverShell {
    Bash,
    Csh,
}

impl FromStr for DriverShell {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains("bash") {
            Ok(DriverShell::Bash)
        } else if s.contains("csh") {
            Ok(DriverShell::Csh)
        } else {
            bail!("unsupported shell {:?}: use bash or csh", s)
        }
    }
}

/// Replay options as requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayJobs {
    pub mode: SpectrometerMode,
    /// Overrides the mode's default replay script.
    pub replay_script: Option<String>,
    pub events: Option<EventLimit>,
    /// Stage every segment up to the run's segment instead of just one.
    pub all_segments: bool,
    /// Archive the replay output to tape.
    pub to_tape: bool,
    pub shell: Option<DriverShell>,
    /// Overrides the default replay tarball.
    pub replay_archive: Option<PathBuf>,
    pub apptainer: Option<PathBuf>,
}

impl ReplayJobs {
    pub fn new(mode: SpectrometerMode) -> Self {
        Self {
            mode,
            replay_script: None,
            events: None,
            all_segments: false,
            to_tape: false,
            shell: None,
            replay_archive: None,
            apptainer: None,
        }
    }

    /// Check the request against the filesystem and settle every choice that
    /// is the same for all runs.
    pub fn resolve(&self, settings: &Settings) -> anyhow::Result<ReplayPlan> {
        let script = match (&self.replay_script, self.mode.default_script()) {
            (Some(script), _) => script.clone(),
            (None, Some(script)) => script.to_string(),
            (None, None) => bail!(
                "spectrometer {} has no default replay script; pass one with --replay",
                self.mode
            ),
        };

        let events = self.events.unwrap_or_else(|| {
            warn!("no events specified, analyzing all events");
            EventLimit::All
        });

        let archive = match &self.replay_archive {
            Some(path) => {
                if !path.is_file() {
                    bail!("user defined replay TAR must exist: {}", path.display());
                }
                path.clone()
            }
            None => {
                let path = &settings.dirs.replay_archive;
                if !path.is_file() {
                    bail!("no default replay TAR found at {}", path.display());
                }
                path.clone()
            }
        };

        if let Some(image) = &self.apptainer {
            if !image.exists() {
                bail!("apptainer image not found: {}", image.display());
            }
        }

        let driver_name = match (&self.apptainer, self.shell) {
            (Some(_), _) => "hcswif_apptainer.sh",
            (None, Some(DriverShell::Csh)) => "hcswif.csh",
            (None, Some(DriverShell::Bash)) => "hcswif2.sh",
            (None, None) if self.all_segments => "hcswif2_all_segs.sh",
            (None, None) => "hcswif2.sh",
        };

        if self.to_tape && self.mode.output_template().is_none() {
            warn!(
                "spectrometer {} has no output layout yet; nothing will be written to tape",
                self.mode
            );
        }

        Ok(ReplayPlan {
            mode: self.mode,
            script,
            events,
            all_segments: self.all_segments,
            to_tape: self.to_tape,
            driver: settings.dirs.script_dir.join(driver_name),
            archive,
            apptainer: self.apptainer.clone(),
        })
    }
}

/// Resolved, run-independent replay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayPlan {
    pub mode: SpectrometerMode,
    pub script: String,
    pub events: EventLimit,
    pub all_segments: bool,
    pub to_tape: bool,
    pub driver: PathBuf,
    pub archive: PathBuf,
    pub apptainer: Option<PathBuf>,
}

/// CODA file stem of a run, e.g. `nps_coin_0042`.
pub fn coda_stem(run_number: u32) -> String {
    format!("nps_coin_{:04}", run_number)
}

/// Raw-data file of one segment of a run.
pub fn raw_file(raw_dir: &Path, run_number: u32, segment: u32) -> PathBuf {
    raw_dir.join(format!("{}.dat.{}", coda_stem(run_number), segment))
}

/// Build the job for a single run.
pub fn build_replay_job(
    plan: &ReplayPlan,
    run: &RunRecord,
    workflow_name: &str,
    settings: &Settings,
) -> anyhow::Result<JobDescriptor> {
    let raw_dir = &settings.dirs.raw_dir;
    let stem = coda_stem(run.run_number);

    let name = if settings.segment_in_job_name {
        format!("{}_{}.dat.{}", workflow_name, stem, run.segment)
    } else {
        format!("{}_{}", workflow_name, stem)
    };

    if plan.all_segments && run.segment > MAX_ALL_SEGMENTS {
        bail!(
            "run {} segment {} is beyond the all-segments limit of {}",
            run.run_number,
            run.segment,
            MAX_ALL_SEGMENTS
        );
    }

    let budget = if plan.all_segments {
        settings.disk.all_segments_budget(run.segment)
    } else {
        settings.disk.segment_budget(2)
    };
    let disk_bytes =
        budget.with_context(|| format!("run {} segment {}", run.run_number, run.segment))?;

    let staged: Vec<PathBuf> = if plan.all_segments {
        (0..=run.segment)
            .map(|seg| raw_file(raw_dir, run.run_number, seg))
            .collect()
    } else {
        vec![
            raw_file(raw_dir, run.run_number, 0),
            raw_file(raw_dir, run.run_number, run.segment),
        ]
    };

    // Segment 0 is listed twice when it is also the job's segment.
    for (i, path) in staged.iter().enumerate() {
        if i == 0 || staged[i - 1] != *path {
            warn_if_missing(path, "RAW DATA");
        }
    }

    let mut inputs = Vec::with_capacity(staged.len() + 1);
    inputs.push(FileMapping::new(
        REPLAY_ARCHIVE_LOCAL,
        plan.archive.to_string_lossy(),
    ));
    inputs.extend(staged.iter().map(FileMapping::from_remote));

    let command = match &plan.apptainer {
        Some(image) => [
            plan.driver.display().to_string(),
            plan.script.clone(),
            run.run_number.to_string(),
            plan.events.to_string(),
            image.display().to_string(),
            raw_dir.display().to_string(),
        ]
        .join(" "),
        None => [
            plan.driver.display().to_string(),
            plan.script.clone(),
            run.run_number.to_string(),
            plan.events.to_string(),
            run.segment.to_string(),
        ]
        .join(" "),
    };

    debug!(job = %name, disk_bytes, inputs = inputs.len(), "built replay job");

    let job = JobDescriptor::new(name, command)
        .with_inputs(inputs)
        .with_disk_bytes(disk_bytes);

    Ok(match output_mapping(plan, run, settings) {
        Some(output) => job.with_outputs(vec![output]),
        None => job,
    })
}

fn output_mapping(plan: &ReplayPlan, run: &RunRecord, settings: &Settings) -> Option<FileMapping> {
    if !plan.to_tape {
        return None;
    }
    let template = plan.mode.output_template()?;

    let local = if plan.mode.is_full_run_output() {
        render_output_name(template, run.run_number, 1, &EventLimit::All.to_string())
    } else {
        render_output_name(template, run.run_number, run.segment, &plan.events.to_string())
    };
    let base = Path::new(&local)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| local.clone());
    let remote = settings
        .dirs
        .tape_out
        .join(plan.mode.output_path_prefix())
        .join(base);

    Some(FileMapping::new(local, remote.to_string_lossy()))
}

/// Build one job per run.
pub fn build_replay_jobs(
    request: &ReplayJobs,
    runs: &[RunRecord],
    workflow_name: &str,
    settings: &Settings,
) -> anyhow::Result<Vec<JobDescriptor>> {
    if runs.is_empty() {
        bail!("no valid runs to process");
    }
    let plan = request.resolve(settings)?;
    runs.iter()
        .map(|run| build_replay_job(&plan, run, workflow_name, settings))
        .collect()
}
