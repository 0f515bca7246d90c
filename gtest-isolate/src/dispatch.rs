// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The top-level entry point: parse the options, enumerate the registry,
//! then supervise, report, and write the document once per iteration.

use crate::{
    metadata,
    options::{self, RunnerOptions},
    reporter::TestReporter,
    runner::TestRunner,
    stopwatch::StopwatchStart,
    test_list::TestList,
};
use anyhow::Result;
use std::io;

/// The embedded unit-test framework that actually executes assertions.
///
/// The runner treats it as an external collaborator. In non-isolated mode the
/// whole argument vector is handed over; in isolated mode each child
/// re-enters it with `--no-isolate` and a single-test filter, and its failure
/// listener writes to the inherited [`FailureSink`](crate::FailureSink).
pub trait TestFramework {
    /// Hands the argument vector to the framework and returns its exit code.
    fn run_all(&self, args: &[String]) -> i32;
}

/// Entry point for a test executable embedding the isolation runner.
///
/// Returns the process exit code: 0 when orchestration completes, regardless
/// of individual test outcomes; 1 on usage, enumeration, supervision, or
/// report-write errors. In non-isolated mode, returns whatever the framework
/// returns.
pub fn isolate_main(mut args: Vec<String>, framework: &dyn TestFramework) -> i32 {
    let options = match options::pick_options(&mut args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("{error}");
            return 1;
        }
    };

    if options.help {
        print!("{}", options::help_text());
        return 0;
    }
    if !options.isolate {
        return framework.run_all(&args);
    }

    match run_isolated(&options, &args) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("{error:#}");
            1
        }
    }
}

fn run_isolated(options: &RunnerOptions, args: &[String]) -> Result<()> {
    let mut test_list = TestList::enumerate(args)?;
    let reporter = TestReporter::new(options);
    let runner = TestRunner::new(options, args);
    let stdout = io::stdout();

    for iteration in 1..=options.iteration_count {
        test_list.reset();
        let stopwatch = StopwatchStart::now();

        reporter.iteration_start(&test_list, iteration, options.iteration_count, stdout.lock())?;
        runner.execute(&mut test_list, |testcase, test_id| {
            reporter.test_end(testcase, test_id, stdout.lock())
        })?;

        let end = stopwatch.end();
        reporter.iteration_end(&test_list, end.duration, stdout.lock())?;
        if let Some(path) = &options.output_path {
            metadata::write_xml(path, &test_list, end.start_time, end.duration)?;
        }
    }

    Ok(())
}
