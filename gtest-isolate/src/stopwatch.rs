// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stopwatch for tracking how long an iteration takes.
//!
//! Iterations need a start time and a duration. For that we use a combination
//! of a local wall-clock timestamp (for the report header) and an `Instant`
//! (monotonic clock). Once the stopwatch transitions to the "end" state, the
//! elapsed time is reported from the monotonic clock.

use chrono::{Local, NaiveDateTime};
use std::time::{Duration, Instant};

/// The start state of a stopwatch.
#[derive(Clone, Debug)]
pub(crate) struct StopwatchStart {
    start_time: NaiveDateTime,
    instant: Instant,
}

impl StopwatchStart {
    pub(crate) fn now() -> Self {
        Self {
            // These two clock reads happen imperceptibly close to each other,
            // which is good enough for our purposes.
            start_time: Local::now().naive_local(),
            instant: Instant::now(),
        }
    }

    pub(crate) fn end(&self) -> StopwatchEnd {
        StopwatchEnd {
            start_time: self.start_time,
            duration: self.instant.elapsed(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StopwatchEnd {
    pub(crate) start_time: NaiveDateTime,
    pub(crate) duration: Duration,
}
