// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a `Report`.

use crate::{Report, SerializeError, TestCase, TestCaseStatus, TestSuite};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Writer,
};
use std::{io, time::Duration};

static TESTSUITES_TAG: &str = "testsuites";
static TESTSUITE_TAG: &str = "testsuite";
static TESTCASE_TAG: &str = "testcase";
static FAILURE_TAG: &str = "failure";

pub(crate) fn serialize_report(
    report: &Report,
    writer: impl io::Write,
) -> Result<(), SerializeError> {
    let mut writer = Writer::new_with_indent(writer, b' ', 2);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer
        .write_event(Event::Decl(decl))
        .map_err(quick_xml::Error::from)?;

    serialize_report_impl(report, &mut writer)?;

    // Add a trailing newline.
    writer.write_indent().map_err(quick_xml::Error::from)?;
    Ok(())
}

fn serialize_report_impl(
    report: &Report,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let Report {
        name,
        timestamp,
        time,
        tests,
        failures,
        disabled,
        errors,
        test_suites,
    } = report;

    let mut testsuites_tag = BytesStart::new(TESTSUITES_TAG);
    testsuites_tag.extend_attributes([
        ("tests", tests.to_string().as_str()),
        ("failures", failures.to_string().as_str()),
        ("disabled", disabled.to_string().as_str()),
        ("errors", errors.to_string().as_str()),
    ]);
    if let Some(timestamp) = timestamp {
        testsuites_tag.push_attribute((
            "timestamp",
            timestamp.format("%Y-%m-%dT%H:%M:%S").to_string().as_str(),
        ));
    }
    serialize_time(&mut testsuites_tag, *time);
    testsuites_tag.push_attribute(("name", name.as_str()));
    writer.write_event(Event::Start(testsuites_tag))?;

    for test_suite in test_suites {
        serialize_test_suite(test_suite, writer)?;
    }

    writer.write_event(Event::End(BytesEnd::new(TESTSUITES_TAG)))?;
    writer.write_event(Event::Eof)?;

    Ok(())
}

fn serialize_test_suite(
    test_suite: &TestSuite,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let TestSuite {
        name,
        tests,
        failures,
        disabled,
        errors,
        time,
        test_cases,
    } = test_suite;

    let mut test_suite_tag = BytesStart::new(TESTSUITE_TAG);
    test_suite_tag.extend_attributes([
        ("name", name.as_str()),
        ("tests", tests.to_string().as_str()),
        ("failures", failures.to_string().as_str()),
        ("disabled", disabled.to_string().as_str()),
        ("errors", errors.to_string().as_str()),
    ]);
    serialize_time(&mut test_suite_tag, *time);
    writer.write_event(Event::Start(test_suite_tag))?;

    for test_case in test_cases {
        serialize_test_case(test_case, writer)?;
    }

    writer.write_event(Event::End(BytesEnd::new(TESTSUITE_TAG)))?;
    Ok(())
}

fn serialize_test_case(
    test_case: &TestCase,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let TestCase {
        name,
        classname,
        time,
        status,
    } = test_case;

    let mut test_case_tag = BytesStart::new(TESTCASE_TAG);
    test_case_tag.extend_attributes([("name", name.as_str()), ("status", "run")]);
    serialize_time(&mut test_case_tag, *time);
    test_case_tag.push_attribute(("classname", classname.as_str()));

    match status {
        TestCaseStatus::Success => {
            // A successful test is a self-closing element.
            writer.write_event(Event::Empty(test_case_tag))?;
        }
        TestCaseStatus::Failure { message } => {
            writer.write_event(Event::Start(test_case_tag))?;

            let mut failure_tag = BytesStart::new(FAILURE_TAG);
            failure_tag.extend_attributes([("message", message.as_str()), ("type", "")]);
            writer.write_event(Event::Start(failure_tag))?;
            writer.write_event(Event::End(BytesEnd::new(FAILURE_TAG)))?;

            writer.write_event(Event::End(BytesEnd::new(TESTCASE_TAG)))?;
        }
    }
    Ok(())
}

fn serialize_time(tag: &mut BytesStart<'_>, time: Duration) {
    tag.push_attribute(("time", format!("{:.3}", time.as_secs_f64()).as_str()));
}
