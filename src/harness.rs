//! libtest bench output parsing
//!
//! Turns the text printed by `cargo bench` with the built-in harness into
//! measurements:
//!
//! ```text
//! test aoc_2020_1a ... bench:     292,557 ns/iter (+/- 64,930)
//! ```
//!
//! Only parses text; running the benchmarks is the harness's job.

use crate::model::{CommitRef, Measurement, Run};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Compiled once; the pattern is a literal
fn bench_line() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(
            r"^test\s+(\S+)\s+\.\.\.\s+bench:\s+([\d,_]+(?:\.\d+)?)\s+(\S+)\s+\(\+/-\s+([\d,_]+(?:\.\d+)?)\)",
        )
        .expect("libtest bench pattern is a valid regex")
    })
}

fn parse_number(text: &str) -> Option<f64> {
    let digits: String = text.chars().filter(|c| *c != ',' && *c != '_').collect();
    digits.parse().ok()
}

/// Extract every bench result line, in output order
///
/// Lines that are not bench results (compile output, `ignored` tests,
/// summaries) are skipped.
pub fn parse_libtest_output(output: &str) -> Vec<Measurement> {
    let pattern = bench_line();
    output
        .lines()
        .filter_map(|line| {
            let caps = pattern.captures(line.trim())?;
            let value = parse_number(&caps[2])?;
            let margin = parse_number(&caps[4])?;
            Some(Measurement::new(&caps[1], value, margin, &caps[3]))
        })
        .collect()
}

/// Build a run from libtest output
pub fn run_from_libtest_output(
    commit: CommitRef,
    tool_id: impl Into<String>,
    collected_at: DateTime<Utc>,
    output: &str,
) -> Run {
    let mut run = Run::new(commit, tool_id, collected_at);
    run.measurements = parse_libtest_output(output);
    tracing::debug!(
        "Parsed {} bench results for commit {}",
        run.measurements.len(),
        run.commit.short_id()
    );
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "\
   Compiling rune-benches v0.0.0
    Finished bench [optimized] target(s) in 42.17s
     Running target/release/deps/main-0f1a

running 4 tests
test aoc_2020_11a          ... bench:  10,216,535 ns/iter (+/- 1,232,122)
test aoc_2020_1a           ... bench:     292,557 ns/iter (+/- 64,930)
test fib_15                ... bench:      52.5 ns/iter (+/- 0.5)
test slow_thing            ... ignored

test result: ok. 0 passed; 0 failed; 1 ignored; 3 measured; 0 filtered out
";

    #[test]
    fn test_bench_line_pattern() {
        let caps = bench_line()
            .captures("test fib_15 ... bench:      52,000 ns/iter (+/- 1,000)")
            .unwrap();
        assert_eq!(&caps[1], "fib_15");
        assert_eq!(&caps[2], "52,000");
        assert_eq!(&caps[3], "ns/iter");
        assert_eq!(&caps[4], "1,000");
    }

    #[test]
    fn test_parse_libtest_output() {
        let benches = parse_libtest_output(OUTPUT);
        assert_eq!(benches.len(), 3);

        assert_eq!(benches[0].name, "aoc_2020_11a");
        assert_eq!(benches[0].value, 10_216_535.0);
        assert_eq!(benches[0].error_margin, 1_232_122.0);
        assert_eq!(benches[0].unit, "ns/iter");

        assert_eq!(benches[1].name, "aoc_2020_1a");
        assert_eq!(benches[1].value, 292_557.0);
        assert_eq!(benches[1].error_margin, 64_930.0);

        assert_eq!(benches[2].value, 52.5);
        assert_eq!(benches[2].error_margin, 0.5);
    }

    #[test]
    fn test_parse_ignores_noise() {
        assert!(parse_libtest_output("").is_empty());
        assert!(parse_libtest_output("test foo ... ok\nrandom text").is_empty());
    }

    #[test]
    fn test_run_from_output() {
        let commit = crate::model::fixtures::commit("e4af457a");
        let run = run_from_libtest_output(commit, "cargo", Utc::now(), OUTPUT);
        assert_eq!(run.tool_id, "cargo");
        assert_eq!(run.measurements.len(), 3);
        assert!(run.validate().is_ok());
    }
}
