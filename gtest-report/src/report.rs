// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{serialize::serialize_report, SerializeError};
use chrono::NaiveDateTime;
use std::{io, time::Duration};

/// The root element of a gtest-style XML report.
#[derive(Clone, Debug)]
pub struct Report {
    /// The name of this report. gtest always calls the root `AllTests`.
    pub name: String,

    /// The local time at which the iteration producing this report started.
    pub timestamp: Option<NaiveDateTime>,

    /// The overall time taken by the iteration.
    ///
    /// This is serialized as the number of seconds, with three decimals.
    pub time: Duration,

    /// The total number of tests from all test suites.
    pub tests: usize,

    /// The total number of non-successful tests from all test suites.
    pub failures: usize,

    /// The total number of disabled tests. Always zero for isolated runs.
    pub disabled: usize,

    /// The total number of errors. Always zero for isolated runs.
    pub errors: usize,

    /// The test suites contained in this report.
    pub test_suites: Vec<TestSuite>,
}

impl Report {
    /// Creates a new `Report` with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            time: Duration::ZERO,
            tests: 0,
            failures: 0,
            disabled: 0,
            errors: 0,
            test_suites: vec![],
        }
    }

    /// Sets the start timestamp for the report.
    pub fn set_timestamp(&mut self, timestamp: NaiveDateTime) -> &mut Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the time taken for overall execution.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = time;
        self
    }

    /// Adds a new [`TestSuite`] and updates the `tests` and `failures` counts.
    ///
    /// When generating a new report, use of this method is recommended over
    /// pushing onto `self.test_suites` directly.
    pub fn add_test_suite(&mut self, test_suite: TestSuite) -> &mut Self {
        self.tests += test_suite.tests;
        self.failures += test_suite.failures;
        self.test_suites.push(test_suite);
        self
    }

    /// Adds several [`TestSuite`]s and updates the `tests` and `failures`
    /// counts.
    pub fn add_test_suites(
        &mut self,
        test_suites: impl IntoIterator<Item = TestSuite>,
    ) -> &mut Self {
        for test_suite in test_suites {
            self.add_test_suite(test_suite);
        }
        self
    }

    /// Serializes this report to the given writer.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        serialize_report(self, writer)
    }

    /// Serializes this report to a string.
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(&self) -> Result<String, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// A single `testsuite` element: one group of tests sharing a case name.
#[derive(Clone, Debug)]
pub struct TestSuite {
    /// The name of this test suite.
    pub name: String,

    /// The total number of tests in this suite.
    pub tests: usize,

    /// The total number of non-successful tests in this suite.
    pub failures: usize,

    /// The total number of disabled tests. Always zero for isolated runs.
    pub disabled: usize,

    /// The total number of errors. Always zero for isolated runs.
    pub errors: usize,

    /// The summed time taken by the tests in this suite.
    pub time: Duration,

    /// The test cases that form this suite.
    pub test_cases: Vec<TestCase>,
}

impl TestSuite {
    /// Creates a new `TestSuite` with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: 0,
            failures: 0,
            disabled: 0,
            errors: 0,
            time: Duration::ZERO,
            test_cases: vec![],
        }
    }

    /// Adds a [`TestCase`] to this suite, updating counts and summed time.
    ///
    /// When generating a new report, use of this method is recommended over
    /// pushing onto `self.test_cases` directly.
    pub fn add_test_case(&mut self, test_case: TestCase) -> &mut Self {
        self.tests += 1;
        if !matches!(test_case.status, TestCaseStatus::Success) {
            self.failures += 1;
        }
        self.time += test_case.time;
        self.test_cases.push(test_case);
        self
    }

    /// Adds several [`TestCase`]s to this suite.
    pub fn add_test_cases(&mut self, test_cases: impl IntoIterator<Item = TestCase>) -> &mut Self {
        for test_case in test_cases {
            self.add_test_case(test_case);
        }
        self
    }
}

/// A single `testcase` element.
#[derive(Clone, Debug)]
pub struct TestCase {
    /// The leaf name of the test.
    pub name: String,

    /// The name of the enclosing suite.
    pub classname: String,

    /// The time taken by the test.
    pub time: Duration,

    /// Whether the test succeeded or failed.
    pub status: TestCaseStatus,
}

impl TestCase {
    /// Creates a new `TestCase`.
    pub fn new(
        name: impl Into<String>,
        classname: impl Into<String>,
        status: TestCaseStatus,
    ) -> Self {
        Self {
            name: name.into(),
            classname: classname.into(),
            time: Duration::ZERO,
            status,
        }
    }

    /// Sets the time taken by the test.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = time;
        self
    }
}

/// The outcome recorded for a [`TestCase`].
#[derive(Clone, Debug)]
pub enum TestCaseStatus {
    /// The test passed. Serialized as a self-closing `testcase` element.
    Success,

    /// The test did not pass. Serialized as a nested `failure` element whose
    /// `message` attribute carries the accumulated failure text verbatim,
    /// newlines included.
    Failure {
        /// The failure message.
        message: String,
    },
}
