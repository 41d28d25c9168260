use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use hcswif::Result;
use hcswif::config::Settings;
use hcswif::job::{CommandJobs, DriverShell, EventLimit, ReplayJobs};
use hcswif::mode::SpectrometerMode;
use hcswif::render::write_workflow;
use hcswif::workflow::{JobRequest, WorkflowRequest, build_workflow};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Replay,
    Command,
}

#[derive(Parser)]
#[command(name = "hcswif")]
#[command(about = "Generate swif2 workflows for Hall C replays and batch commands", long_about = None)]
struct Cli {
    /// Type of workflow.
    #[arg(long, value_enum, ignore_case = true)]
    mode: Option<Mode>,

    /// Spectrometer to analyze (HMS_ALL, NPS_ALL, HMS_PROD, VLD_REPLAY, NPS_PROD,
    /// HMS_COIN, NPS_SKIM, NPS_COIN, NPS_COIN_SCALER, HMS_SCALER, NPS_SCALER).
    #[arg(long)]
    spectrometer: Option<String>,

    /// Run numbers and ranges (e.g. 2040-2055), or `file <path>`.
    #[arg(long, num_args = 1..)]
    run: Vec<String>,

    /// Number of events to analyze (default: all).
    #[arg(long)]
    events: Option<EventLimit>,

    /// Workflow name.
    #[arg(long)]
    name: Option<String>,

    /// hcana replay script, relative to the replay directory.
    #[arg(long)]
    replay: Option<String>,

    /// Shell command to run, or `file <path>` with one command per line.
    #[arg(long, num_args = 1..)]
    command: Vec<String>,

    /// File listing inputs to fetch from tape (command mode only).
    #[arg(long)]
    filelist: Option<PathBuf>,

    #[arg(long)]
    account: Option<String>,

    /// Disk space in bytes for runs listed without one.
    #[arg(long)]
    disk: Option<u64>,

    /// RAM in bytes.
    #[arg(long)]
    ram: Option<u64>,

    /// CPU cores.
    #[arg(long)]
    cpu: Option<u32>,

    /// Max run time per job in seconds.
    #[arg(long)]
    time: Option<u64>,

    /// Driver script flavour (bash or csh).
    #[arg(long)]
    shell: Option<DriverShell>,

    /// Write replay output to tape (true/false).
    #[arg(long = "to-mss", alias = "to_mss", value_parser = parse_flag)]
    to_mss: Option<bool>,

    /// Stage every segment of a run into its job (true/false).
    #[arg(long = "all-segs", alias = "all_segs", value_parser = parse_flag)]
    all_segs: Option<bool>,

    /// Replay tarball to stage (default: /group/nps/$USER/nps_replay.tar.gz).
    #[arg(long = "specify-replay", alias = "specify_replay")]
    specify_replay: Option<PathBuf>,

    /// swif2 constraints (slurm features).
    #[arg(long, num_args = 1..)]
    constraint: Vec<String>,

    /// Apptainer image to run the replay in.
    #[arg(long)]
    apptainer: Option<PathBuf>,

    /// Include the segment number in replay job names.
    #[arg(long)]
    segment_in_name: bool,

    #[arg(long, env = "USER")]
    user: String,

    #[arg(long)]
    json_dir: Option<PathBuf>,

    #[arg(long)]
    stdout_dir: Option<PathBuf>,

    #[arg(long)]
    stderr_dir: Option<PathBuf>,

    #[arg(long)]
    raw_dir: Option<PathBuf>,

    #[arg(long)]
    tape_out: Option<PathBuf>,

    /// Directory holding the hcswif driver scripts (default: next to this binary).
    #[arg(long)]
    script_dir: Option<PathBuf>,
}

fn parse_flag(s: &str) -> std::result::Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("must be True or False, got {:?}", s)),
    }
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let script_dir = match &self.script_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_exe()
                .context("locate hcswif executable")?
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };

        let now = chrono::Local::now().naive_local();
        let mut settings = Settings::new(&self.user, now, script_dir);
        settings.segment_in_job_name = self.segment_in_name;

        let dirs = &mut settings.dirs;
        for (slot, value) in [
            (&mut dirs.json_dir, &self.json_dir),
            (&mut dirs.stdout_dir, &self.stdout_dir),
            (&mut dirs.stderr_dir, &self.stderr_dir),
            (&mut dirs.raw_dir, &self.raw_dir),
            (&mut dirs.tape_out, &self.tape_out),
        ] {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }

        Ok(settings)
    }

    fn request(&self) -> Result<WorkflowRequest> {
        let Some(mode) = self.mode else {
            bail!("must specify a mode (replay or command)");
        };

        let jobs = match mode {
            Mode::Replay => {
                let spectrometer: SpectrometerMode = self
                    .spectrometer
                    .as_deref()
                    .context("replay mode needs --spectrometer")?
                    .parse()?;
                let mut replay = ReplayJobs::new(spectrometer);
                replay.replay_script = self.replay.clone();
                replay.events = self.events;
                replay.all_segments = self.all_segs.unwrap_or(false);
                replay.to_tape = self.to_mss.unwrap_or(false);
                replay.shell = self.shell;
                replay.replay_archive = self.specify_replay.clone();
                replay.apptainer = self.apptainer.clone();
                JobRequest::Replay {
                    runs: self.run.clone(),
                    replay,
                }
            }
            Mode::Command => JobRequest::Command(CommandJobs {
                command: self.command.clone(),
                filelist: self.filelist.clone(),
            }),
        };

        let mut request = WorkflowRequest::new(jobs);
        request.name = self.name.clone();
        request.account = self.account.clone();
        request.disk_bytes = self.disk;
        request.ram_bytes = self.ram;
        request.cpu_cores = self.cpu;
        request.time_secs = self.time;
        request.constraints = self.constraint.clone();
        Ok(request)
    }
}

/// Ask on the terminal whether to fall back to `account`.
fn confirm_on_stdin(account: &str) -> Result<bool> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Should I use account={}? (y/n): ", account);
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Ok(false);
        };
        match line?.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => continue,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hcswif=info")),
        )
        .with_writer(io::stderr)
        .init();

    println!("Ensure your analyzer can compile with the default OS");
    println!("Currently no check on constraints. See the scicomp Slurm Info page for the latest constraints.");

    let settings = cli.settings()?;
    settings.warn_missing_directories();

    let request = cli.request()?;
    let (workflow, path) = build_workflow(&request, &settings, confirm_on_stdin)?;

    write_workflow(&workflow, &path)?;
    println!("Wrote: {}", path.display());

    Ok(())
}
