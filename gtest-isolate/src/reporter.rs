// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable progress reporting for an isolated test run.
//!
//! All content goes through an injected writer; colors route through the
//! `Styles` table, whose default entries are no-ops so plain-text content is
//! identical with color off.

use crate::{
    options::RunnerOptions,
    test_list::{TestCase, TestList, TestResult},
};
use owo_colors::{OwoColorize, Style};
use std::{
    io::{self, Write},
    time::Duration,
};

/// Writes per-iteration progress lines and the end-of-iteration summary.
pub struct TestReporter {
    styles: Box<Styles>,
    print_time: bool,
    warnline_ms: u64,
}

impl TestReporter {
    /// Creates a new reporter with the display settings from `options`.
    pub fn new(options: &RunnerOptions) -> Self {
        let mut styles = Box::new(Styles::default());
        if options.color.should_colorize(atty::Stream::Stdout) {
            styles.colorize();
        }
        Self {
            styles,
            print_time: options.print_time,
            warnline_ms: options.warnline_ms,
        }
    }

    /// The `[==========]` banner at the start of an iteration.
    pub fn iteration_start(
        &self,
        test_list: &TestList,
        iteration: usize,
        iteration_count: usize,
        mut writer: impl Write,
    ) -> io::Result<()> {
        if iteration_count > 1 {
            writeln!(writer, "\nRepeating all tests (iteration {iteration}) . . .\n")?;
        }

        let test_count = test_list.test_count();
        let case_count = test_list.case_count();
        write!(writer, "{}", "[==========] ".style(self.styles.pass))?;
        writeln!(
            writer,
            "Running {} {} from {} {}.",
            test_count,
            plural(test_count, "test"),
            case_count,
            plural(case_count, "test case"),
        )
    }

    /// The status line for a single finished test, followed by its
    /// accumulated failure message verbatim.
    pub fn test_end(
        &self,
        testcase: &TestCase,
        test_id: usize,
        mut writer: impl Write,
    ) -> io::Result<()> {
        let test = testcase.test(test_id);
        let tag = match test.result() {
            TestResult::Success => "[    OK    ] ".style(self.styles.pass),
            TestResult::Failed => "[  FAILED  ] ".style(self.styles.fail),
            TestResult::Timeout => "[ TIMEOUT  ] ".style(self.styles.fail),
            TestResult::Pending => unreachable!("only terminal statuses are reported"),
        };
        write!(writer, "{}", tag)?;
        write!(writer, "{}", testcase.qualified_name(test_id))?;
        if self.print_time {
            writeln!(writer, " ({} ms)", test.elapsed().as_millis())?;
        } else {
            writeln!(writer)?;
        }
        write!(writer, "{}", test.failure_message())
    }

    /// The end-of-iteration banner and summary: totals, the pass count, and
    /// the Failed, Timeout, and Slow sections for categories with at least
    /// one member.
    pub fn iteration_end(
        &self,
        test_list: &TestList,
        elapsed: Duration,
        mut writer: impl Write,
    ) -> io::Result<()> {
        let mut fail_tests: Vec<String> = vec![];
        let mut timeout_tests: Vec<(String, u128)> = vec![];
        let mut slow_tests: Vec<(String, u128)> = vec![];
        let mut success_count = 0usize;

        let test_count = test_list.test_count();
        let case_count = test_list.case_count();
        for testcase in test_list.test_cases() {
            for (test_id, test) in testcase.tests().iter().enumerate() {
                let elapsed_ms = test.elapsed().as_millis();
                match test.result() {
                    TestResult::Success => success_count += 1,
                    TestResult::Failed => fail_tests.push(testcase.qualified_name(test_id)),
                    TestResult::Timeout => {
                        timeout_tests.push((testcase.qualified_name(test_id), elapsed_ms))
                    }
                    TestResult::Pending => {}
                }
                if test.result() != TestResult::Timeout && elapsed_ms >= self.warnline_ms as u128 {
                    slow_tests.push((testcase.qualified_name(test_id), elapsed_ms));
                }
            }
        }

        write!(writer, "{}", "[==========] ".style(self.styles.pass))?;
        write!(
            writer,
            "{} {} from {} {} ran.",
            test_count,
            plural(test_count, "test"),
            case_count,
            plural(case_count, "test case"),
        )?;
        if self.print_time {
            write!(writer, " ({} ms total)", elapsed.as_millis())?;
        }
        writeln!(writer)?;

        write!(writer, "{}", "[   PASS   ] ".style(self.styles.pass))?;
        writeln!(
            writer,
            "{} {}.",
            success_count,
            plural(success_count, "test")
        )?;

        if !fail_tests.is_empty() {
            write!(writer, "{}", "[   FAIL   ] ".style(self.styles.fail))?;
            writeln!(
                writer,
                "{} {}, listed below:",
                fail_tests.len(),
                plural(fail_tests.len(), "test")
            )?;
            for name in &fail_tests {
                write!(writer, "{}", "[   FAIL   ] ".style(self.styles.fail))?;
                writeln!(writer, "{name}")?;
            }
        }

        if !timeout_tests.is_empty() {
            write!(writer, "{}", "[ TIMEOUT  ] ".style(self.styles.fail))?;
            writeln!(
                writer,
                "{} {}, listed below:",
                timeout_tests.len(),
                plural(timeout_tests.len(), "test")
            )?;
            for (name, stopped_ms) in &timeout_tests {
                write!(writer, "{}", "[ TIMEOUT  ] ".style(self.styles.fail))?;
                writeln!(writer, "{name} (stopped at {stopped_ms} ms)")?;
            }
        }

        if !slow_tests.is_empty() {
            write!(writer, "{}", "[   SLOW   ] ".style(self.styles.warn))?;
            writeln!(
                writer,
                "{} {}, listed below:",
                slow_tests.len(),
                plural(slow_tests.len(), "test")
            )?;
            for (name, elapsed_ms) in &slow_tests {
                write!(writer, "{}", "[   SLOW   ] ".style(self.styles.warn))?;
                writeln!(
                    writer,
                    "{name} ({elapsed_ms} ms, exceed warnline {} ms)",
                    self.warnline_ms
                )?;
            }
        }

        if !fail_tests.is_empty() {
            writeln!(
                writer,
                "\n{:2} FAILED {}",
                fail_tests.len(),
                plural_upper(fail_tests.len(), "TEST")
            )?;
        }
        if !timeout_tests.is_empty() {
            writeln!(
                writer,
                "{:2} TIMEOUT {}",
                timeout_tests.len(),
                plural_upper(timeout_tests.len(), "TEST")
            )?;
        }
        if !slow_tests.is_empty() {
            writeln!(
                writer,
                "{:2} SLOW {}",
                slow_tests.len(),
                plural_upper(slow_tests.len(), "TEST")
            )?;
        }

        Ok(())
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_owned()
    } else {
        format!("{noun}s")
    }
}

fn plural_upper(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_owned()
    } else {
        format!("{noun}S")
    }
}

#[derive(Debug, Default)]
struct Styles {
    pass: Style,
    fail: Style,
    warn: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.pass = Style::new().green();
        self.fail = Style::new().red();
        self.warn = Style::new().yellow();
    }
}
