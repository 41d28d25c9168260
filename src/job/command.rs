//! Command-mode jobs: one job per shell command.

use crate::job::{FileMapping, JobDescriptor, warn_if_missing};
use crate::runs::FILE_KEYWORD;
use anyhow::{Context, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Header marker of a pattern file list.
pub const PATTERN_MARKER: &str = "PATTERN";

/// Command options as requested by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandJobs {
    /// A command with its arguments, or `file <path>` naming a file with one
    /// command per line.
    pub command: Vec<String>,
    pub filelist: Option<PathBuf>,
}

/// Input files to stage for every command.
///
/// File shape:
/// PATTERN <arg index>
/// /mss/path/to/run_{param}.dat
/// ...
///
/// `{param}` is replaced by the command's argument at `<arg index>`
/// (0 is the program itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileList {
    pub param_index: usize,
    pub templates: Vec<String>,
}

impl FileList {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("read file list {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("bad file list {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut lines = text.lines();
        let header = lines.next().context("file list is empty")?;
        let fields: Vec<&str> = header.split_whitespace().collect();

        let param_index = match fields.as_slice() {
            [marker, index, ..] if *marker == PATTERN_MARKER => index
                .parse::<usize>()
                .with_context(|| format!("bad {} argument index {:?}", PATTERN_MARKER, index))?,
            [marker] if *marker == PATTERN_MARKER => {
                bail!("{} header needs an argument index", PATTERN_MARKER)
            }
            _ => bail!(
                "unsupported file list header {:?}: only `{} <arg index>` lists are supported",
                header,
                PATTERN_MARKER
            ),
        };

        let templates = lines
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            param_index,
            templates,
        })
    }

    /// Input mappings for one command.
    pub fn inputs_for(&self, command: &str) -> anyhow::Result<Vec<FileMapping>> {
        let args: Vec<&str> = command.split_whitespace().collect();
        let Some(param) = args.get(self.param_index) else {
            bail!(
                "file list pattern uses argument {} but command {:?} has only {}",
                self.param_index,
                command,
                args.len()
            );
        };

        Ok(self
            .templates
            .iter()
            .map(|t| {
                let path = PathBuf::from(t.replace("{param}", param));
                warn_if_missing(&path, "RAW DATA");
                FileMapping::from_remote(path)
            })
            .collect())
    }
}

impl CommandJobs {
    /// The commands to run, one per job.
    pub fn commands(&self) -> anyhow::Result<Vec<String>> {
        let Some(first) = self.command.first() else {
            bail!("must specify command for batch job");
        };

        let commands: Vec<String> = if first == FILE_KEYWORD {
            let path = self
                .command
                .get(1)
                .context("command file mode needs a path: --command file <path>")?;
            let text = fs::read_to_string(path)
                .with_context(|| format!("read command file {}", path))?;
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            vec![self.command.join(" ")]
        };

        if commands.is_empty() {
            bail!("must specify command for batch job: command file has no commands");
        }
        Ok(commands)
    }
}

/// Build one job per command, named `<workflow>_job<N>`.
pub fn build_command_jobs(
    request: &CommandJobs,
    workflow_name: &str,
) -> anyhow::Result<Vec<JobDescriptor>> {
    let commands = request.commands()?;

    let filelist = match &request.filelist {
        Some(path) => Some(FileList::from_file(path)?),
        None => {
            warn!("no file list specified, assuming your script fetches its own inputs");
            None
        }
    };

    let mut jobs = Vec::with_capacity(commands.len());
    for cmd in commands {
        let name = format!("{}_job{}", workflow_name, jobs.len());
        let mut job = JobDescriptor::new(name, cmd.as_str());
        if let Some(list) = &filelist {
            job = job.with_inputs(list.inputs_for(&cmd)?);
        }
        debug!(job = %job.name, "built command job");
        jobs.push(job);
    }

    Ok(jobs)
}
