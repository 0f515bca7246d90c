// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The supervision engine: a bounded pool of child-process slots driven by a
//! single-threaded polling loop.

use crate::{
    errors::RunnerError,
    launcher::{self, ChildProc},
    options::RunnerOptions,
    test_list::{TestCase, TestList, TestResult},
};
use std::{
    io,
    os::unix::process::ExitStatusExt,
    process::ExitStatus,
    thread,
    time::{Duration, Instant},
};
use tracing::warn;

/// Runs enumerated tests in isolated child processes, at most
/// `job_count` at a time.
pub struct TestRunner<'a> {
    options: &'a RunnerOptions,
    args: &'a [String],
}

impl<'a> TestRunner<'a> {
    /// Creates a new runner over the residual argument vector.
    pub fn new(options: &'a RunnerOptions, args: &'a [String]) -> Self {
        Self { options, args }
    }

    /// Executes one iteration over the registry.
    ///
    /// Dispatch follows enumeration order; `on_test_end` is called as each
    /// test reaches a terminal status, in completion order. Outcomes are
    /// recorded on the registry itself, so report assembly can restore
    /// enumeration order afterwards.
    pub fn execute<F>(&self, test_list: &mut TestList, mut on_test_end: F) -> Result<(), RunnerError>
    where
        F: FnMut(&TestCase, usize) -> io::Result<()>,
    {
        let deadline = Duration::from_millis(self.options.deadline_ms);
        let mut slots: Vec<Option<ChildProc>> = Vec::new();
        slots.resize_with(self.options.job_count, || None);

        let mut cursor = TestCursor::default();
        let total = test_list.test_count();
        let mut finished = 0usize;

        while finished < total {
            // Dispatch: fill every empty slot while tests remain.
            for slot in slots.iter_mut() {
                if slot.is_none() {
                    if let Some((testcase_id, test_id)) = cursor.next(test_list) {
                        let test_name = test_list.test_cases()[testcase_id].qualified_name(test_id);
                        *slot = Some(launcher::launch(
                            self.args,
                            &test_name,
                            testcase_id,
                            test_id,
                            deadline,
                        )?);
                    }
                }
            }

            // Wait for any child to finish or run past its deadline.
            wait_any(&mut slots)?;

            // Collect every completed slot.
            for slot in slots.iter_mut() {
                if !slot.as_ref().is_some_and(|child| child.completed) {
                    continue;
                }
                let mut child = slot.take().expect("completed slot holds a child");
                let elapsed = child.start.elapsed();

                if child.timed_out {
                    // Kill and reap before reading, so the pipe's write end
                    // is closed and the drain sees end-of-file.
                    warn!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        "child ran past its deadline, killing"
                    );
                    child.kill_and_reap()?;
                }
                child.drain_to_eof()?;

                let test_name = test_list.test_cases()[child.testcase_id].qualified_name(child.test_id);
                let (result, synthesized) = classify_outcome(
                    &test_name,
                    child.timed_out,
                    child.exit_status,
                    elapsed,
                    !child.output.is_empty(),
                );

                {
                    let test = test_list
                        .test_case_mut(child.testcase_id)
                        .test_mut(child.test_id);
                    test.set_elapsed(elapsed);
                    if !child.output.is_empty() {
                        test.append_failure_message(&String::from_utf8_lossy(&child.output));
                    }
                    test.set_result(result);
                    if let Some(line) = synthesized {
                        test.append_failure_message(&line);
                    }
                }

                on_test_end(&test_list.test_cases()[child.testcase_id], child.test_id)
                    .map_err(RunnerError::WriteEvent)?;
                finished += 1;
            }
        }

        Ok(())
    }
}

/// One pass of the polling wait: returns once at least one slot is marked
/// completed, either by a non-blocking reap or by a deadline violation.
/// Never blocks while any slot has a future deadline.
fn wait_any(slots: &mut [Option<ChildProc>]) -> Result<(), RunnerError> {
    loop {
        let mut any_completed = false;

        for child in slots.iter_mut().flatten() {
            let reaped = loop {
                match child.child.try_wait() {
                    Ok(reaped) => break reaped,
                    Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                    Err(error) => return Err(RunnerError::Wait(error)),
                }
            };
            if let Some(status) = reaped {
                child.completed = true;
                child.timed_out = false;
                child.exit_status = Some(status);
                any_completed = true;
            }
        }

        if !any_completed {
            let now = Instant::now();
            for child in slots.iter_mut().flatten() {
                if child.deadline <= now {
                    child.completed = true;
                    child.timed_out = true;
                    any_completed = true;
                }
            }
        }

        if any_completed {
            return Ok(());
        }

        // Pick up whatever the children have written so far; a child blocked
        // on a full pipe must be drained before its deadline passes.
        for child in slots.iter_mut().flatten() {
            child.drain_ready()?;
        }

        // Sleep 1 ms to avoid busy looping.
        thread::sleep(Duration::from_millis(1));
    }
}

/// Applies the terminal-status rules to a completed slot. Returns the status
/// and an optional synthesized line to append after the drained pipe output.
fn classify_outcome(
    test_name: &str,
    timed_out: bool,
    exit_status: Option<ExitStatus>,
    elapsed: Duration,
    has_output: bool,
) -> (TestResult, Option<String>) {
    if timed_out {
        return (
            TestResult::Timeout,
            Some(format!(
                "{} killed because of timeout at {} ms.\n",
                test_name,
                elapsed.as_millis()
            )),
        );
    }

    let status = exit_status.expect("a child that did not time out has an exit status");
    if let Some(signal) = status.signal() {
        return (
            TestResult::Failed,
            Some(format!(
                "{} terminated by signal: {}.\n",
                test_name,
                signal_name(signal)
            )),
        );
    }

    match status.code() {
        Some(0) => (TestResult::Success, None),
        code => {
            let code = code.unwrap_or(1);
            // Keep failure messages non-empty even when the child wrote
            // nothing before exiting.
            let line =
                (!has_output).then(|| format!("{test_name} exited with exit code {code}.\n"));
            (TestResult::Failed, line)
        }
    }
}

fn signal_name(signal: i32) -> String {
    let name = match signal {
        libc::SIGHUP => "SIGHUP",
        libc::SIGINT => "SIGINT",
        libc::SIGQUIT => "SIGQUIT",
        libc::SIGILL => "SIGILL",
        libc::SIGTRAP => "SIGTRAP",
        libc::SIGABRT => "SIGABRT",
        libc::SIGBUS => "SIGBUS",
        libc::SIGFPE => "SIGFPE",
        libc::SIGKILL => "SIGKILL",
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGPIPE => "SIGPIPE",
        libc::SIGALRM => "SIGALRM",
        libc::SIGTERM => "SIGTERM",
        _ => return format!("signal {signal}"),
    };
    name.to_owned()
}

/// Next test to run, in enumeration order, carrying over case boundaries.
#[derive(Clone, Copy, Debug, Default)]
struct TestCursor {
    testcase_id: usize,
    test_id: usize,
}

impl TestCursor {
    fn next(&mut self, test_list: &TestList) -> Option<(usize, usize)> {
        let cases = test_list.test_cases();
        while self.testcase_id < cases.len() && cases[self.testcase_id].test_count() == 0 {
            self.testcase_id += 1;
        }
        if self.testcase_id >= cases.len() {
            return None;
        }

        let current = (self.testcase_id, self.test_id);
        self.test_id += 1;
        if self.test_id == cases[self.testcase_id].test_count() {
            self.test_id = 0;
            self.testcase_id += 1;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cursor_carries_over_case_boundaries() {
        let test_list = TestList::parse(indoc! {"
            a.
              one
              two
            b.
              three
        "})
        .expect("valid output");

        let mut cursor = TestCursor::default();
        let mut order = vec![];
        while let Some(pair) = cursor.next(&test_list) {
            order.push(pair);
        }
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn test_cursor_skips_empty_cases() {
        let test_list = TestList::parse(indoc! {"
            empty.
            a.
              one
        "})
        .expect("valid output");

        let mut cursor = TestCursor::default();
        assert_eq!(cursor.next(&test_list), Some((1, 0)));
        assert_eq!(cursor.next(&test_list), None);
    }

    #[test]
    fn test_classify_timeout() {
        let (result, line) =
            classify_outcome("t.slow", true, None, Duration::from_millis(750), false);
        assert_eq!(result, TestResult::Timeout);
        assert_eq!(
            line.as_deref(),
            Some("t.slow killed because of timeout at 750 ms.\n")
        );
    }

    #[test]
    fn test_classify_exit_codes() {
        let ok = ExitStatus::from_raw(0);
        let (result, line) = classify_outcome("t.ok", false, Some(ok), Duration::ZERO, false);
        assert_eq!(result, TestResult::Success);
        assert_eq!(line, None);

        // Exit code 1, nothing written to the pipe: a line is synthesized.
        let failed = ExitStatus::from_raw(0x0100);
        let (result, line) = classify_outcome("t.bad", false, Some(failed), Duration::ZERO, false);
        assert_eq!(result, TestResult::Failed);
        assert_eq!(line.as_deref(), Some("t.bad exited with exit code 1.\n"));

        // Exit code 1 with pipe output: the message is already non-empty.
        let (result, line) = classify_outcome("t.bad", false, Some(failed), Duration::ZERO, true);
        assert_eq!(result, TestResult::Failed);
        assert_eq!(line, None);
    }

    #[test]
    fn test_classify_signal() {
        let signaled = ExitStatus::from_raw(libc::SIGSEGV);
        let (result, line) =
            classify_outcome("t.seg", false, Some(signaled), Duration::ZERO, false);
        assert_eq!(result, TestResult::Failed);
        assert_eq!(
            line.as_deref(),
            Some("t.seg terminated by signal: SIGSEGV.\n")
        );
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(signal_name(libc::SIGSEGV), "SIGSEGV");
        assert_eq!(signal_name(libc::SIGKILL), "SIGKILL");
        assert_eq!(signal_name(64), "signal 64");
    }
}
