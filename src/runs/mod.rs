//! Run specifications: run numbers, ranges, and run files.

pub mod parse;
pub mod record;

pub use parse::{FILE_KEYWORD, MAX_RANGE_RUNS, parse_run_file, parse_run_spec, parse_run_tokens};
pub use record::{RunList, RunRecord};
