// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use std::{io, process::ExitStatus};
use thiserror::Error;

/// An error in the runner's own command-line options.
///
/// Usage errors are printed to standard error and the runner exits with
/// status 1.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum UsageError {
    /// The `-j` value was missing, non-numeric, or not positive.
    #[error("invalid job count: {0}")]
    InvalidJobCount(String),

    /// The `--deadline=` value was not a positive integer.
    #[error("invalid deadline: {0}")]
    InvalidDeadline(String),

    /// The `--warnline=` value was not a positive integer.
    #[error("invalid warnline: {0}")]
    InvalidWarnline(String),

    /// The `--gtest_repeat=` value was negative or non-numeric.
    #[error("invalid gtest_repeat count: {0}")]
    InvalidRepeat(String),

    /// The `--gtest_output=` value could not be turned into a usable path.
    #[error("invalid gtest_output file: {0}")]
    InvalidOutput(String),
}

/// An error that occurs while enumerating the tests inside the executable.
#[derive(Debug, Error)]
pub enum EnumerateError {
    /// Spawning the list command failed.
    #[error("running '{command}' failed")]
    Spawn {
        /// The command that was run.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The list command exited with a non-zero status.
    #[error("'{command}' exited with {status}")]
    Exit {
        /// The command that was run.
        command: String,

        /// The exit status.
        status: ExitStatus,
    },

    /// The list output contained a line with several tokens, meaning the
    /// child rejected the argument vector.
    #[error("argument error, check with --help")]
    ArgumentError,

    /// A test line appeared before any test case line.
    #[error("unexpected line in test list output: '{line}'")]
    ParseLine {
        /// The offending line.
        line: String,
    },
}

/// An I/O error inside the supervision engine. All of these are fatal to the
/// runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Creating the failure pipe failed.
    #[error("failed to create failure pipe")]
    CreatePipe(#[source] io::Error),

    /// Spawning a child test process failed.
    #[error("failed to spawn child for test {test}")]
    Spawn {
        /// The qualified test name.
        test: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Reaping a child failed.
    #[error("failed to wait for child")]
    Wait(#[source] io::Error),

    /// Killing a timed-out child failed.
    #[error("failed to kill timed-out child")]
    Kill(#[source] io::Error),

    /// Polling a child's failure pipe failed.
    #[error("failed to poll failure pipe")]
    Poll(#[source] io::Error),

    /// Reading a child's failure pipe failed.
    #[error("failed to read failure pipe")]
    ReadPipe(#[source] io::Error),

    /// Writing a progress line failed.
    #[error("error writing test progress")]
    WriteEvent(#[source] io::Error),
}

/// An error that occurs while writing the XML report document.
#[derive(Debug, Error)]
pub enum WriteReportError {
    /// The output file could not be created.
    #[error("failed to open '{path}'")]
    Create {
        /// The output file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Serializing the report into the output file failed.
    #[error("failed to write report to '{path}'")]
    Serialize {
        /// The output file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: gtest_report::SerializeError,
    },
}
