// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The registry of enumerated tests, gotten by executing the test binary
//! with `--gtest_list_tests`.

use crate::errors::EnumerateError;
use duct::cmd;
use std::time::Duration;

/// Result status of a single test.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TestResult {
    /// The test has not finished yet in the current iteration.
    Pending,
    /// The child exited with status 0.
    Success,
    /// The child exited non-zero or was terminated by a signal.
    Failed,
    /// The child exceeded its deadline and was killed.
    Timeout,
}

/// A single named test inside a test case.
///
/// Created in [`TestResult::Pending`] state during enumeration; the
/// supervisor records the outcome when the child is collected.
#[derive(Clone, Debug)]
pub struct Test {
    name: String,
    result: TestResult,
    elapsed: Duration,
    failure_message: String,
}

impl Test {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            result: TestResult::Pending,
            elapsed: Duration::ZERO,
            failure_message: String::new(),
        }
    }

    /// The leaf name of the test.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The recorded outcome.
    pub fn result(&self) -> TestResult {
        self.result
    }

    /// The recorded wall-clock duration.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The accumulated failure message. Non-empty exactly for failed and
    /// timed-out tests.
    pub fn failure_message(&self) -> &str {
        &self.failure_message
    }

    pub(crate) fn set_result(&mut self, result: TestResult) {
        self.result = result;
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub(crate) fn append_failure_message(&mut self, message: &str) {
        self.failure_message.push_str(message);
    }

    fn reset(&mut self) {
        self.result = TestResult::Pending;
        self.elapsed = Duration::ZERO;
        self.failure_message.clear();
    }
}

/// A named group of tests. Insertion order reflects enumeration order and is
/// preserved in reports.
#[derive(Clone, Debug)]
pub struct TestCase {
    name: String,
    tests: Vec<Test>,
}

impl TestCase {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            tests: vec![],
        }
    }

    /// The name of the test case.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tests belonging to this case, in enumeration order.
    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    /// The number of tests in this case.
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// A single test by index.
    pub fn test(&self, test_id: usize) -> &Test {
        &self.tests[test_id]
    }

    /// The qualified `case.test` name of a test.
    pub fn qualified_name(&self, test_id: usize) -> String {
        format!("{}.{}", self.name, self.tests[test_id].name)
    }

    pub(crate) fn test_mut(&mut self, test_id: usize) -> &mut Test {
        &mut self.tests[test_id]
    }

    fn push_test(&mut self, name: &str) {
        self.tests.push(Test::new(name));
    }
}

/// Ordered list of test cases enumerated from the test executable.
#[derive(Clone, Debug)]
pub struct TestList {
    test_cases: Vec<TestCase>,
}

impl TestList {
    /// Enumerates tests by spawning `args[0]` with the residual arguments
    /// plus `--gtest_list_tests` and parsing its standard output.
    pub fn enumerate(args: &[String]) -> Result<Self, EnumerateError> {
        let mut list_args: Vec<String> = args[1..].to_vec();
        list_args.push("--gtest_list_tests".to_owned());
        let command = format!("{} --gtest_list_tests", args[0]);

        let output = cmd(args[0].as_str(), &list_args)
            .stdout_capture()
            .unchecked()
            .run()
            .map_err(|error| EnumerateError::Spawn {
                command: command.clone(),
                error,
            })?;
        if !output.status.success() {
            return Err(EnumerateError::Exit {
                command,
                status: output.status,
            });
        }

        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parses the output of `--gtest_list_tests`.
    ///
    /// The format is: case lines ending with a trailing `.`, each followed by
    /// indented lines naming the tests of that case. Leading and trailing
    /// whitespace per line are ignored. A line with several tokens means the
    /// child rejected the arguments.
    pub fn parse(list_output: &str) -> Result<Self, EnumerateError> {
        let mut test_cases: Vec<TestCase> = vec![];

        for line in list_output.lines() {
            let mut tokens = line.split_whitespace();
            let Some(token) = tokens.next() else {
                continue;
            };
            if tokens.next().is_some() {
                // gtest met an error when parsing the arguments.
                return Err(EnumerateError::ArgumentError);
            }

            if let Some(case_name) = token.strip_suffix('.') {
                test_cases.push(TestCase::new(case_name));
            } else {
                match test_cases.last_mut() {
                    Some(case) => case.push_test(token),
                    None => {
                        return Err(EnumerateError::ParseLine {
                            line: line.to_owned(),
                        })
                    }
                }
            }
        }

        Ok(Self { test_cases })
    }

    /// The test cases, in enumeration order.
    pub fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }

    /// The number of test cases.
    pub fn case_count(&self) -> usize {
        self.test_cases.len()
    }

    /// The total number of tests across all cases.
    pub fn test_count(&self) -> usize {
        self.test_cases.iter().map(TestCase::test_count).sum()
    }

    pub(crate) fn test_case_mut(&mut self, testcase_id: usize) -> &mut TestCase {
        &mut self.test_cases[testcase_id]
    }

    /// Returns every test to the pending state for the next iteration.
    pub fn reset(&mut self) {
        for case in &mut self.test_cases {
            for test in &mut case.tests {
                test.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse() {
        let list_output = indoc! {"
            math.
              add
              sub
            string.
              concat
        "};

        let test_list = TestList::parse(list_output).expect("valid output");
        assert_eq!(test_list.case_count(), 2);
        assert_eq!(test_list.test_count(), 3);

        let names: Vec<_> = test_list
            .test_cases()
            .iter()
            .map(|case| {
                (
                    case.name(),
                    case.tests().iter().map(Test::name).collect::<Vec<_>>(),
                )
            })
            .collect();
        assert_eq!(
            names,
            vec![("math", vec!["add", "sub"]), ("string", vec!["concat"])]
        );

        assert_eq!(test_list.test_cases()[0].qualified_name(1), "math.sub");
        for case in test_list.test_cases() {
            for test in case.tests() {
                assert_eq!(test.result(), TestResult::Pending);
                assert_eq!(test.failure_message(), "");
            }
        }
    }

    #[test]
    fn test_parse_ignores_blank_lines() {
        let test_list = TestList::parse("\n  \nmath.\n  add\n\n").expect("valid output");
        assert_eq!(test_list.test_count(), 1);
    }

    #[test]
    fn test_parse_rejects_multiple_tokens() {
        // gtest reports argument errors as prose on stdout.
        let err = TestList::parse("unrecognized option --frobnicate\n").expect_err("prose line");
        assert!(matches!(err, EnumerateError::ArgumentError));
    }

    #[test]
    fn test_parse_rejects_test_before_case() {
        let err = TestList::parse("  add\nmath.\n").expect_err("orphan test line");
        assert!(matches!(err, EnumerateError::ParseLine { .. }));
    }

    #[test]
    fn test_reset_clears_outcomes() {
        let mut test_list = TestList::parse("math.\n  add\n").expect("valid output");
        {
            let test = test_list.test_case_mut(0).test_mut(0);
            test.set_result(TestResult::Failed);
            test.set_elapsed(Duration::from_millis(5));
            test.append_failure_message("boom\n");
        }
        test_list.reset();
        let test = test_list.test_cases()[0].test(0);
        assert_eq!(test.result(), TestResult::Pending);
        assert_eq!(test.elapsed(), Duration::ZERO);
        assert_eq!(test.failure_message(), "");
    }

    #[test]
    fn test_enumerate_spawn_failure() {
        let args = vec!["/nonexistent/test_bin".to_owned()];
        let err = TestList::enumerate(&args).expect_err("spawn failed");
        assert!(matches!(err, EnumerateError::Spawn { .. }));
    }
}
