// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gtest-report` is a data model and serializer for gtest-style XML reports.
//!
//! The entry point is [`Report`], which holds a tree of [`TestSuite`] and
//! [`TestCase`] values and serializes them in the shape emitted by gtest's
//! own XML printer: one `testsuites` root, one `testsuite` per test case
//! group, and one `testcase` per test, with failure text carried as a
//! `message` attribute on a nested `failure` element.

mod errors;
mod report;
mod serialize;

pub use errors::*;
pub use report::*;
