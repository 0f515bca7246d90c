// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A parallel, process-isolated runner for gtest-style test executables.
//!
//! A test executable embeds the runner by handing its argument vector to
//! [`isolate_main`] together with an implementation of [`TestFramework`],
//! the seam to the embedded unit-test framework. The runner enumerates the
//! tests inside the executable, fans them out one-per-child-process across a
//! bounded worker pool, kills children that run past their deadline, collects
//! failure text over a dedicated pipe, and emits both a human-readable
//! progress report and an optional XML document.
//!
//! Children are the same executable, re-invoked with `--no-isolate` and a
//! single-test filter; their failure listeners write to the inherited
//! [`FailureSink`].

pub mod dispatch;
pub mod errors;
mod launcher;
mod metadata;
pub mod options;
pub mod reporter;
pub mod runner;
mod stopwatch;
pub mod test_list;

pub use dispatch::{isolate_main, TestFramework};
pub use launcher::{FailureSink, OUTPUT_FD_ENV};
