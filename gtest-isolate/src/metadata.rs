// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building and writing the end-of-iteration XML document.

use crate::{
    errors::WriteReportError,
    test_list::{TestList, TestResult},
};
use camino::Utf8Path;
use chrono::NaiveDateTime;
use gtest_report::{Report, TestCase, TestCaseStatus, TestSuite};
use std::{fs::File, time::Duration};

/// Writes the XML report for one finished iteration, truncating and
/// overwriting any existing file at `path`.
pub(crate) fn write_xml(
    path: &Utf8Path,
    test_list: &TestList,
    start_time: NaiveDateTime,
    elapsed: Duration,
) -> Result<(), WriteReportError> {
    let report = build_report(test_list, start_time, elapsed);

    let file = File::create(path).map_err(|error| WriteReportError::Create {
        path: path.to_owned(),
        error,
    })?;
    report
        .serialize(file)
        .map_err(|error| WriteReportError::Serialize {
            path: path.to_owned(),
            error,
        })
}

/// Assembles the report in enumeration order from the registry's recorded
/// outcomes.
fn build_report(test_list: &TestList, start_time: NaiveDateTime, elapsed: Duration) -> Report {
    let mut report = Report::new("AllTests");
    report.set_timestamp(start_time).set_time(elapsed);

    for testcase in test_list.test_cases() {
        let mut suite = TestSuite::new(testcase.name());
        for test in testcase.tests() {
            let status = match test.result() {
                TestResult::Success => TestCaseStatus::Success,
                _ => TestCaseStatus::Failure {
                    message: test.failure_message().to_owned(),
                },
            };
            let mut entry = TestCase::new(test.name(), testcase.name(), status);
            entry.set_time(test.elapsed());
            suite.add_test_case(entry);
        }
        report.add_test_suite(suite);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use indoc::indoc;

    #[test]
    fn test_build_report_counts_and_order() {
        let mut test_list = TestList::parse(indoc! {"
            math.
              add
              sub
            string.
              concat
        "})
        .expect("valid output");

        {
            let test = test_list.test_case_mut(0).test_mut(0);
            test.set_result(TestResult::Success);
            test.set_elapsed(Duration::from_millis(100));
        }
        {
            let test = test_list.test_case_mut(0).test_mut(1);
            test.set_result(TestResult::Failed);
            test.set_elapsed(Duration::from_millis(200));
            test.append_failure_message("expected 1 got 2\n");
        }
        {
            let test = test_list.test_case_mut(1).test_mut(0);
            test.set_result(TestResult::Timeout);
            test.set_elapsed(Duration::from_millis(500));
            test.append_failure_message("string.concat killed because of timeout at 500 ms.\n");
        }

        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let report = build_report(&test_list, start, Duration::from_millis(800));

        assert_eq!(report.tests, 3);
        assert_eq!(report.failures, 2);
        assert_eq!(report.test_suites.len(), 2);
        assert_eq!(report.test_suites[0].name, "math");
        assert_eq!(report.test_suites[0].time, Duration::from_millis(300));
        assert_eq!(report.test_suites[1].name, "string");

        // Report order equals enumeration order, not completion order.
        let names: Vec<_> = report.test_suites[0]
            .test_cases
            .iter()
            .map(|tc| tc.name.as_str())
            .collect();
        assert_eq!(names, vec!["add", "sub"]);

        let xml = report.to_string().expect("serialization succeeded");
        assert!(xml.contains(r#"<testsuites tests="3" failures="2" disabled="0" errors="0" timestamp="2024-06-01T09:00:00" time="0.800" name="AllTests">"#));
        assert!(xml.contains(r#"<testcase name="add" status="run" time="0.100" classname="math"/>"#));
        assert!(xml.contains(r#"message="expected 1 got 2"#));
    }
}
