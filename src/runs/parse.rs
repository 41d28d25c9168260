use crate::runs::record::{RunList, RunRecord};
use anyhow::{Context, bail};
use regex::Regex;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// First token that switches `--run` (and `--command`) into file mode.
pub const FILE_KEYWORD: &str = "file";

/// Most runs a single `A-B` token may expand to.
pub const MAX_RANGE_RUNS: u32 = 100_000;

/// Turn the raw `--run` tokens into run records.
///
/// `file <path>` reads a run file; anything else is a list of single run
/// numbers and inclusive `A-B` ranges. `disk` is the disk size given to runs
/// that do not carry their own (bare run numbers).
pub fn parse_run_spec(tokens: &[String], disk: u64) -> anyhow::Result<RunList> {
    let Some(first) = tokens.first() else {
        bail!("must specify run(s) to process");
    };

    if first == FILE_KEYWORD {
        let path = tokens
            .get(1)
            .context("run file mode needs a path: --run file <path>")?;
        if tokens.len() > 2 {
            warn!("ignoring extra run arguments after {}: {:?}", path, &tokens[2..]);
        }
        return parse_run_file(path, disk);
    }

    parse_run_tokens(tokens, disk)
}

/// Parse a run file into run records.
///
/// Expected lines (whitespace-separated):
/// run  segment  disk_bytes
/// or a bare run number.
///
/// Example:
/// 3012 4 40000000000
/// 3013
pub fn parse_run_file(path: impl AsRef<Path>, disk: u64) -> anyhow::Result<RunList> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("read run file {}", path.display()))?;

    let mut out = RunList::new();
    for (lineno, line) in text.lines().enumerate() {
        let lno = lineno + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();

        let record = match fields.as_slice() {
            [] => continue,
            [run] => RunRecord::new(parse_field(run, "run", path, lno)?, 0, disk),
            [run, segment, disk_bytes] => RunRecord::new(
                parse_field(run, "run", path, lno)?,
                parse_field(segment, "segment", path, lno)?,
                parse_field(disk_bytes, "disk", path, lno)?,
            ),
            _ => bail!(
                "run file parse error at {}:{}: expected `run` or `run segment disk`, got {:?}",
                path.display(),
                lno,
                line
            ),
        };
        out.push(record);
    }

    Ok(out)
}

/// Expand run numbers and `A-B` ranges, in the order given.
///
/// Tokens that are neither are skipped with a warning. A reversed range is an
/// error.
pub fn parse_run_tokens(tokens: &[String], disk: u64) -> anyhow::Result<RunList> {
    let range_re = Regex::new(r"^(\d+)-(\d+)$")?;
    let single_re = Regex::new(r"^\d+$")?;

    let mut out = RunList::new();
    for token in tokens {
        if let Some(caps) = range_re.captures(token) {
            let first: u32 = caps[1]
                .parse()
                .with_context(|| format!("bad range start in {:?}", token))?;
            let last: u32 = caps[2]
                .parse()
                .with_context(|| format!("bad range end in {:?}", token))?;
            if first > last {
                bail!(
                    "invalid run range {:?}: start {} is greater than end {}",
                    token,
                    first,
                    last
                );
            }
            if last - first >= MAX_RANGE_RUNS {
                bail!(
                    "run range {:?} spans {} runs, more than the limit of {}",
                    token,
                    u64::from(last - first) + 1,
                    MAX_RANGE_RUNS
                );
            }
            out.extend((first..=last).map(|run| RunRecord::new(run, 0, disk)));
        } else if single_re.is_match(token) {
            let run: u32 = token
                .parse()
                .with_context(|| format!("bad run number {:?}", token))?;
            out.push(RunRecord::new(run, 0, disk));
        } else {
            warn!("invalid run argument {:?}, skipping", token);
        }
    }

    Ok(out)
}

fn parse_field<T>(raw: &str, field: &str, path: &Path, lno: usize) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>().map_err(|e| {
        anyhow::anyhow!(
            "run file parse error at {}:{}: bad {} {:?}: {}",
            path.display(),
            lno,
            field,
            raw,
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DISK: u64 = 10_000_000_000;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn run_file(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[rstest]
    #[case(100, 102)]
    #[case(7, 7)]
    #[case(2040, 2055)]
    fn range_expands_inclusive_ascending(#[case] first: u32, #[case] last: u32) {
        let runs = parse_run_tokens(&tokens(&[&format!("{}-{}", first, last)]), DISK).unwrap();
        let numbers: Vec<u32> = runs.iter().map(|r| r.run_number).collect();
        assert_eq!(numbers, (first..=last).collect::<Vec<_>>());
        assert_eq!(runs.len() as u32, last - first + 1);
    }

    #[test]
    fn reversed_range_is_an_error() {
        let err = parse_run_tokens(&tokens(&["102-100"]), DISK).unwrap_err();
        assert!(err.to_string().contains("invalid run range"));
    }

    #[test]
    fn oversized_range_is_an_error() {
        let err = parse_run_tokens(&tokens(&["0-4000000000"]), DISK).unwrap_err();
        assert!(err.to_string().contains("more than the limit"), "{}", err);

        let widest = format!("1-{}", MAX_RANGE_RUNS);
        assert_eq!(
            parse_run_tokens(&tokens(&[&widest]), DISK).unwrap().len() as u32,
            MAX_RANGE_RUNS
        );
    }

    #[test]
    fn bare_tokens_get_default_disk_and_segment_zero() {
        let runs = parse_run_tokens(&tokens(&["3012"]), DISK).unwrap();
        assert_eq!(runs, vec![RunRecord::new(3012, 0, DISK)]);
    }

    #[test]
    fn invalid_tokens_are_skipped_and_duplicates_kept() {
        let runs = parse_run_tokens(&tokens(&["5", "abc", "4-5", "12-x"]), DISK).unwrap();
        let numbers: Vec<u32> = runs.iter().map(|r| r.run_number).collect();
        assert_eq!(numbers, vec![5, 4, 5]);
    }

    #[test]
    fn run_file_reads_triples_in_order() {
        let f = run_file("3012 4 40000000000\n\n3010 0 20000000000\n");
        let runs = parse_run_file(f.path(), DISK).unwrap();
        assert_eq!(
            runs,
            vec![
                RunRecord::new(3012, 4, 40_000_000_000),
                RunRecord::new(3010, 0, 20_000_000_000),
            ]
        );
    }

    #[test]
    fn run_file_bare_numbers_use_given_disk() {
        let f = run_file("3012\n3013\n");
        let runs = parse_run_file(f.path(), 5).unwrap();
        assert_eq!(runs, vec![RunRecord::new(3012, 0, 5), RunRecord::new(3013, 0, 5)]);
    }

    #[rstest]
    #[case("3012 x 100\n")]
    #[case("3012 1\n")]
    #[case("run\n")]
    #[case("3012 1 -5\n")]
    fn malformed_run_file_lines_fail(#[case] contents: &str) {
        let f = run_file(contents);
        let err = parse_run_file(f.path(), DISK).unwrap_err();
        assert!(err.to_string().contains("run file parse error"), "{}", err);
    }

    #[test]
    fn spec_dispatches_on_file_keyword() {
        let f = run_file("42 3 7\n");
        let path = f.path().to_string_lossy().to_string();
        let runs = parse_run_spec(&[FILE_KEYWORD.to_string(), path], DISK).unwrap();
        assert_eq!(runs, vec![RunRecord::new(42, 3, 7)]);
    }

    #[test]
    fn spec_requires_tokens_and_file_path() {
        assert!(parse_run_spec(&[], DISK).is_err());
        assert!(parse_run_spec(&tokens(&["file"]), DISK).is_err());
    }
}
