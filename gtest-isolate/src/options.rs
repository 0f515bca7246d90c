// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splitting the argument vector into runner-owned options and the residual
//! arguments handed to the embedded framework.

use crate::errors::UsageError;
use camino::Utf8PathBuf;

/// Default per-test hard deadline, in milliseconds.
pub const DEFAULT_DEADLINE_MS: u64 = 60_000;

/// Default per-test slow threshold, in milliseconds.
pub const DEFAULT_WARNLINE_MS: u64 = 2_000;

/// Name of the self-test filter pattern. Self tests exercise the runner
/// itself and are excluded from ordinary runs.
const SELFTEST_PATTERN: &str = "bionic_selftest*";

static HELP_TEXT: &str = "\
Isolation Test Options:
  -j [JOB_COUNT] or -j[JOB_COUNT]
      Run up to JOB_COUNT tests in parallel.
      Use isolation mode, run each test in a separate process.
      If JOB_COUNT is not given, it is set to the count of available processors.
  --no-isolate
      Don't use isolation mode, run all tests in a single process.
  --deadline=[TIME_IN_MS]
      Run each test in no longer than [TIME_IN_MS] time.
      It takes effect only in isolation mode. Default deadline is 60000 ms.
  --warnline=[TIME_IN_MS]
      Test running longer than [TIME_IN_MS] will be warned.
      It takes effect only in isolation mode. Default warnline is 2000 ms.
  --gtest-filter=POSITIVE_PATTERNS[-NEGATIVE_PATTERNS]
      Used as a synonym for --gtest_filter option in gtest.

Default unit test option is -j.

";

/// Returns the help text for the runner-owned options.
pub fn help_text() -> &'static str {
    HELP_TEXT
}

/// Coloring: always, auto, never.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Color {
    /// Always emit color codes.
    Always,
    /// Emit color codes when standard output is a terminal.
    #[default]
    Auto,
    /// Never emit color codes.
    Never,
}

impl Color {
    /// Parses a `--gtest_color=` value the way gtest does.
    fn from_gtest_value(value: &str) -> Self {
        match value {
            "yes" | "true" | "t" | "1" | "always" => Color::Always,
            "no" | "false" | "f" | "0" | "never" => Color::Never,
            _ => Color::Auto,
        }
    }

    pub(crate) fn should_colorize(self, stream: atty::Stream) -> bool {
        match self {
            Color::Always => true,
            Color::Auto => atty::is(stream),
            Color::Never => false,
        }
    }
}

/// Options owned by the isolation runner, picked out of the argument vector
/// by [`pick_options`].
#[derive(Clone, Debug)]
pub struct RunnerOptions {
    /// Whether to run each test in its own child process. When false the
    /// engine is bypassed and the whole vector goes to the framework.
    pub isolate: bool,

    /// Whether a help flag was seen. The caller prints help and exits 0.
    pub help: bool,

    /// Upper bound on concurrent child processes.
    pub job_count: usize,

    /// Per-test hard deadline, in milliseconds.
    pub deadline_ms: u64,

    /// Per-test slow threshold, in milliseconds.
    pub warnline_ms: u64,

    /// Number of times to re-run the full registry.
    pub iteration_count: usize,

    /// Destination for the XML report, if requested.
    pub output_path: Option<Utf8PathBuf>,

    /// Coloring for the progress report.
    pub color: Color,

    /// Whether to print per-test durations.
    pub print_time: bool,

    /// Whether the run is restricted to the runner's own self tests.
    pub selftest: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            isolate: true,
            help: false,
            job_count: num_cpus::get(),
            deadline_ms: DEFAULT_DEADLINE_MS,
            warnline_ms: DEFAULT_WARNLINE_MS,
            iteration_count: 1,
            output_path: None,
            color: Color::default(),
            print_time: true,
            selftest: false,
        }
    }
}

/// Picks the runner-owned options out of `args`, leaving behind only what the
/// embedded framework should see.
///
/// On success the vector has been rewritten: the filter synonym is
/// normalized, the last filter argument is replaced by a composed one
/// appended at the end (where it wins over any earlier duplicates),
/// iteration-count and output-path flags are stripped so children run exactly
/// one test and write no report, and `--no-isolate` is inserted as the first
/// post-program argument so re-exec'd children never recurse into isolation
/// mode.
pub fn pick_options(args: &mut Vec<String>) -> Result<RunnerOptions, UsageError> {
    let mut options = RunnerOptions::default();

    if args.iter().skip(1).any(|arg| arg == "--help" || arg == "-h") {
        options.help = true;
        options.isolate = false;
        return Ok(options);
    }

    rewrite_filter_synonym(args);

    // --bionic-selftest stays in the vector so re-exec'd children keep the
    // mode.
    options.selftest = args.iter().skip(1).any(|arg| arg == "--bionic-selftest");

    // Pull out the last pre-existing filter argument and re-add the composed
    // one at the end, where it wins over any earlier duplicates.
    let mut filter = None;
    for i in (1..args.len()).rev() {
        if args[i].starts_with("--gtest_filter=") {
            filter = Some(args.remove(i));
            break;
        }
    }
    args.push(compose_filter(filter.as_deref(), options.selftest));

    if args
        .iter()
        .skip(1)
        .any(|arg| arg == "--no-isolate" || arg == "--gtest_list_tests")
    {
        options.isolate = false;
        return Ok(options);
    }

    let mut i = 1;
    while i < args.len() {
        let arg = args[i].clone();
        if let Some(suffix) = arg.strip_prefix("-j") {
            if !suffix.is_empty() {
                options.job_count = parse_job_count(suffix)?;
            } else if let Some(count) = args.get(i + 1).and_then(|next| next.parse::<i64>().ok()) {
                if count <= 0 {
                    return Err(UsageError::InvalidJobCount(count.to_string()));
                }
                options.job_count = count as usize;
                i += 1;
            }
            // Bare -j keeps the processor-count default.
        } else if let Some(value) = arg.strip_prefix("--deadline=") {
            options.deadline_ms = parse_positive_ms(value)
                .ok_or_else(|| UsageError::InvalidDeadline(value.to_owned()))?;
        } else if let Some(value) = arg.strip_prefix("--warnline=") {
            options.warnline_ms = parse_positive_ms(value)
                .ok_or_else(|| UsageError::InvalidWarnline(value.to_owned()))?;
        } else if let Some(value) = arg.strip_prefix("--gtest_color=") {
            options.color = Color::from_gtest_value(value);
        } else if arg == "--gtest_print_time=0" {
            options.print_time = false;
        } else if let Some(value) = arg.strip_prefix("--gtest_repeat=") {
            let repeat: i64 = value
                .parse()
                .map_err(|_| UsageError::InvalidRepeat(value.to_owned()))?;
            if repeat < 0 {
                return Err(UsageError::InvalidRepeat(value.to_owned()));
            }
            options.iteration_count = repeat as usize;
            // Children run exactly one iteration of one test.
            args.remove(i);
            continue;
        } else if let Some(value) = arg.strip_prefix("--gtest_output=") {
            options.output_path = Some(normalize_output_path(value)?);
            // Children produce no report file.
            args.remove(i);
            continue;
        }
        i += 1;
    }

    // As death tests re-exec the executable, this argument must always be
    // present in what children see.
    args.insert(1, "--no-isolate".to_owned());
    Ok(options)
}

/// Rewrites the `--gtest-filter` spelling to the canonical `--gtest_filter`,
/// preserving any value that follows.
fn rewrite_filter_synonym(args: &mut [String]) {
    for arg in args.iter_mut().skip(1) {
        if let Some(rest) = arg.strip_prefix("--gtest-filter") {
            *arg = format!("--gtest_filter{rest}");
        }
    }
}

/// Builds the single filter argument left in the vector.
fn compose_filter(existing: Option<&str>, selftest: bool) -> String {
    if selftest {
        return format!("--gtest_filter={SELFTEST_PATTERN}");
    }
    match existing {
        None => format!("--gtest_filter=-{SELFTEST_PATTERN}"),
        Some(filter) => {
            if filter.contains(":-") {
                // The filter already has a negative clause.
                format!("{filter}:{SELFTEST_PATTERN}")
            } else {
                format!("{filter}:-{SELFTEST_PATTERN}")
            }
        }
    }
}

fn parse_job_count(value: &str) -> Result<usize, UsageError> {
    match value.parse::<i64>() {
        Ok(count) if count > 0 => Ok(count as usize),
        _ => Err(UsageError::InvalidJobCount(value.to_owned())),
    }
}

fn parse_positive_ms(value: &str) -> Option<u64> {
    match value.parse::<i64>() {
        Ok(ms) if ms > 0 => Some(ms as u64),
        _ => None,
    }
}

/// Normalizes a `--gtest_output=` value. An `xml:` prefix is stripped, the
/// remainder is made absolute against the current working directory, and a
/// value ending in the path separator gets the default file name appended.
/// Values without the prefix pass through untouched.
fn normalize_output_path(value: &str) -> Result<Utf8PathBuf, UsageError> {
    let Some(rest) = value.strip_prefix("xml:") else {
        return Ok(Utf8PathBuf::from(value));
    };
    if rest.is_empty() {
        return Err(UsageError::InvalidOutput(value.to_owned()));
    }

    let mut path = Utf8PathBuf::from(rest);
    if path.is_relative() {
        let cwd = std::env::current_dir()
            .map_err(|_| UsageError::InvalidOutput(value.to_owned()))
            .and_then(|cwd| {
                Utf8PathBuf::try_from(cwd).map_err(|_| UsageError::InvalidOutput(value.to_owned()))
            })?;
        path = cwd.join(path);
    }
    if rest.ends_with('/') {
        path.push("test_details.xml");
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_help_short_circuits() {
        for flag in ["--help", "-h"] {
            let mut argv = args(&["test_bin", flag]);
            let options = pick_options(&mut argv).expect("parse succeeded");
            assert!(options.help);
            assert!(!options.isolate);
        }
    }

    #[test]
    fn test_default_filter_excludes_selftests() {
        let mut argv = args(&["test_bin"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert!(options.isolate);
        assert_eq!(
            argv,
            args(&["test_bin", "--no-isolate", "--gtest_filter=-bionic_selftest*"])
        );
    }

    #[test]
    fn test_filter_without_negative_clause_gains_one() {
        let mut argv = args(&["test_bin", "--gtest_filter=A"]);
        pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(
            argv,
            args(&["test_bin", "--no-isolate", "--gtest_filter=A:-bionic_selftest*"])
        );
    }

    #[test]
    fn test_filter_with_negative_clause_is_extended() {
        let mut argv = args(&["test_bin", "--gtest_filter=A:-B"]);
        pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(
            argv,
            args(&["test_bin", "--no-isolate", "--gtest_filter=A:-B:bionic_selftest*"])
        );
    }

    #[test]
    fn test_selftest_mode_overrides_filter() {
        let mut argv = args(&["test_bin", "--bionic-selftest", "--gtest_filter=A"]);
        pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(
            argv,
            args(&[
                "test_bin",
                "--no-isolate",
                "--bionic-selftest",
                "--gtest_filter=bionic_selftest*",
            ])
        );
    }

    #[test]
    fn test_filter_synonym_is_rewritten() {
        let mut argv = args(&["test_bin", "--gtest-filter=suite.*"]);
        pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(
            argv,
            args(&[
                "test_bin",
                "--no-isolate",
                "--gtest_filter=suite.*:-bionic_selftest*",
            ])
        );
    }

    #[test]
    fn test_last_filter_wins() {
        let mut argv = args(&["test_bin", "--gtest_filter=A", "--gtest_filter=B"]);
        pick_options(&mut argv).expect("parse succeeded");
        // Only the last filter is composed; the earlier duplicate stays in
        // the vector and loses to the composed one appended after it.
        assert_eq!(
            argv,
            args(&[
                "test_bin",
                "--no-isolate",
                "--gtest_filter=A",
                "--gtest_filter=B:-bionic_selftest*",
            ])
        );
    }

    #[test]
    fn test_no_isolate_bypasses_engine() {
        let mut argv = args(&["test_bin", "--no-isolate"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert!(!options.isolate);
    }

    #[test]
    fn test_list_tests_bypasses_engine() {
        let mut argv = args(&["test_bin", "--gtest_list_tests"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert!(!options.isolate);
    }

    #[test]
    fn test_job_count_forms() {
        let mut argv = args(&["test_bin", "-j17"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(options.job_count, 17);

        let mut argv = args(&["test_bin", "-j", "5"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(options.job_count, 5);

        // Bare -j falls back to the processor count.
        let mut argv = args(&["test_bin", "-j"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(options.job_count, num_cpus::get());
    }

    #[test]
    fn test_invalid_job_counts() {
        for argv in [&["test_bin", "-j0"][..], &["test_bin", "-j", "-3"][..]] {
            let mut argv = args(argv);
            let err = pick_options(&mut argv).expect_err("non-positive job count");
            assert!(matches!(err, UsageError::InvalidJobCount(_)));
        }
    }

    #[test]
    fn test_deadline_and_warnline() {
        let mut argv = args(&["test_bin", "--deadline=500", "--warnline=100"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(options.deadline_ms, 500);
        assert_eq!(options.warnline_ms, 100);

        let mut argv = args(&["test_bin", "--deadline=0"]);
        let err = pick_options(&mut argv).expect_err("non-positive deadline");
        assert!(matches!(err, UsageError::InvalidDeadline(_)));

        let mut argv = args(&["test_bin", "--warnline=-1"]);
        let err = pick_options(&mut argv).expect_err("non-positive warnline");
        assert!(matches!(err, UsageError::InvalidWarnline(_)));
    }

    #[test]
    fn test_repeat_is_parsed_and_stripped() {
        let mut argv = args(&["test_bin", "--gtest_repeat=3", "-j2"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(options.iteration_count, 3);
        assert_eq!(
            argv,
            args(&[
                "test_bin",
                "--no-isolate",
                "-j2",
                "--gtest_filter=-bionic_selftest*",
            ])
        );

        let mut argv = args(&["test_bin", "--gtest_repeat=-1"]);
        let err = pick_options(&mut argv).expect_err("negative repeat");
        assert!(matches!(err, UsageError::InvalidRepeat(_)));
    }

    #[test]
    fn test_output_path_is_normalized_and_stripped() {
        let cwd = Utf8PathBuf::try_from(std::env::current_dir().expect("cwd exists"))
            .expect("cwd is UTF-8");

        let mut argv = args(&["test_bin", "--gtest_output=xml:out/"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(
            options.output_path,
            Some(cwd.join("out").join("test_details.xml"))
        );
        assert_eq!(
            argv,
            args(&["test_bin", "--no-isolate", "--gtest_filter=-bionic_selftest*"])
        );

        let mut argv = args(&["test_bin", "--gtest_output=xml:report.xml"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(options.output_path, Some(cwd.join("report.xml")));

        let mut argv = args(&["test_bin", "--gtest_output=xml:/tmp/report.xml"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(options.output_path, Some(Utf8PathBuf::from("/tmp/report.xml")));
    }

    #[test]
    fn test_output_path_without_prefix_passes_through() {
        let mut argv = args(&["test_bin", "--gtest_output=plain.txt"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(options.output_path, Some(Utf8PathBuf::from("plain.txt")));
    }

    #[test]
    fn test_empty_output_path_is_an_error() {
        let mut argv = args(&["test_bin", "--gtest_output=xml:"]);
        let err = pick_options(&mut argv).expect_err("empty output path");
        assert!(matches!(err, UsageError::InvalidOutput(_)));
    }

    #[test]
    fn test_cosmetic_flags_are_recorded_and_forwarded() {
        let mut argv = args(&["test_bin", "--gtest_color=never", "--gtest_print_time=0"]);
        let options = pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(options.color, Color::Never);
        assert!(!options.print_time);
        // Cosmetic flags stay in the vector for the children.
        assert!(argv.contains(&"--gtest_color=never".to_owned()));
        assert!(argv.contains(&"--gtest_print_time=0".to_owned()));
    }

    #[test]
    fn test_no_isolate_is_inserted_first() {
        let mut argv = args(&["test_bin", "-j2", "--deadline=100"]);
        pick_options(&mut argv).expect("parse succeeded");
        assert_eq!(argv[1], "--no-isolate");
    }
}
