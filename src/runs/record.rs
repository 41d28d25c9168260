/// A single run to replay, as read from the command line or a run file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRecord {
    pub run_number: u32,
    /// Disk size carried by the run file (or the default for bare run numbers).
    pub disk_override: u64,
    pub segment: u32,
}

impl RunRecord {
    pub fn new(run_number: u32, segment: u32, disk_override: u64) -> Self {
        Self {
            run_number,
            disk_override,
            segment,
        }
    }
}

/// Runs in input order. Duplicates are kept.
pub type RunList = Vec<RunRecord>;
