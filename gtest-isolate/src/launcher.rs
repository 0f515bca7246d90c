// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Launching a child process that runs exactly one test, and the child-side
//! failure channel.
//!
//! The supervisor and its children are the same executable. A child receives
//! the full residual argument vector (with `--no-isolate` first, so it never
//! recurses into isolation mode) plus a trailing single-test filter, and
//! inherits the write end of an anonymous pipe. The fd number travels in the
//! [`OUTPUT_FD_ENV`] environment variable; the framework's failure listener
//! picks it up through [`FailureSink::from_env`].

use crate::errors::RunnerError;
use std::{
    fs::File,
    io::{self, Read, Write},
    os::unix::io::{AsRawFd, FromRawFd, RawFd},
    process::{Child, Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};
use tracing::debug;

/// Environment variable naming the file descriptor a child writes failure
/// text to.
pub const OUTPUT_FD_ENV: &str = "GTEST_ISOLATE_OUTPUT_FD";

/// A running child test process and the parent-side bookkeeping for its slot.
pub(crate) struct ChildProc {
    pub(crate) child: Child,
    read_pipe: File,
    pub(crate) start: Instant,
    pub(crate) deadline: Instant,
    pub(crate) testcase_id: usize,
    pub(crate) test_id: usize,
    /// Bytes drained from the failure pipe so far.
    pub(crate) output: Vec<u8>,
    pub(crate) completed: bool,
    pub(crate) timed_out: bool,
    pub(crate) exit_status: Option<ExitStatus>,
}

/// Spawns a child running the single named test.
pub(crate) fn launch(
    args: &[String],
    test_name: &str,
    testcase_id: usize,
    test_id: usize,
    deadline: Duration,
) -> Result<ChildProc, RunnerError> {
    let (read_pipe, write_pipe) = failure_pipe().map_err(RunnerError::CreatePipe)?;

    debug!(test = test_name, "spawning isolated child");
    let child = Command::new(&args[0])
        .args(&args[1..])
        .arg(format!("--gtest_filter={test_name}"))
        .env(OUTPUT_FD_ENV, write_pipe.as_raw_fd().to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|error| RunnerError::Spawn {
            test: test_name.to_owned(),
            error,
        })?;
    // The parent keeps only the read end; dropping the write end here makes
    // the child the sole writer, so draining sees end-of-file once it exits.
    drop(write_pipe);

    let start = Instant::now();
    Ok(ChildProc {
        child,
        read_pipe,
        start,
        deadline: start + deadline,
        testcase_id,
        test_id,
        output: vec![],
        completed: false,
        timed_out: false,
        exit_status: None,
    })
}

/// Creates the failure pipe. The read end is close-on-exec so later children
/// don't hold it open; the write end must survive exec into the child.
fn failure_pipe() -> io::Result<(File, File)> {
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
        return Err(io::Error::last_os_error());
    }
    let read = unsafe { File::from_raw_fd(fds[0]) };
    let write = unsafe { File::from_raw_fd(fds[1]) };
    if unsafe { libc::fcntl(fds[0], libc::F_SETFD, libc::FD_CLOEXEC) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok((read, write))
}

impl ChildProc {
    /// Appends any bytes already available on the failure pipe without
    /// blocking. Keeps a child that filled the pipe from stalling on a write
    /// it would never finish.
    pub(crate) fn drain_ready(&mut self) -> Result<(), RunnerError> {
        loop {
            let mut pollfd = libc::pollfd {
                fd: self.read_pipe.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            let ready = unsafe { libc::poll(&mut pollfd, 1, 0) };
            if ready == -1 {
                let error = io::Error::last_os_error();
                if error.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(RunnerError::Poll(error));
            }
            if ready == 0 || pollfd.revents & libc::POLLIN == 0 {
                return Ok(());
            }

            let mut buf = [0u8; 1024];
            match self.read_pipe.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(count) => self.output.extend_from_slice(&buf[..count]),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(RunnerError::ReadPipe(error)),
            }
        }
    }

    /// Reads the failure pipe to end-of-file. Called only after the child has
    /// exited or been killed and reaped, so the write end is already closed.
    pub(crate) fn drain_to_eof(&mut self) -> Result<(), RunnerError> {
        self.read_pipe
            .read_to_end(&mut self.output)
            .map_err(RunnerError::ReadPipe)?;
        Ok(())
    }

    /// Kills a timed-out child and blocks until it is reaped.
    pub(crate) fn kill_and_reap(&mut self) -> Result<(), RunnerError> {
        self.child.kill().map_err(RunnerError::Kill)?;
        self.child.wait().map_err(RunnerError::Wait)?;
        Ok(())
    }
}

/// Child-side handle to the failure pipe installed by the launcher.
///
/// The embedded framework's failure listener obtains one at startup and
/// reports each assertion failure through it. Call [`FailureSink::from_env`]
/// at most once per process; the sink takes ownership of the inherited
/// descriptor.
pub struct FailureSink {
    file: File,
}

impl FailureSink {
    /// Returns the sink inherited from the supervising process, if this
    /// process was launched as an isolated child.
    pub fn from_env() -> Option<Self> {
        let fd: RawFd = std::env::var(OUTPUT_FD_ENV).ok()?.parse().ok()?;
        Some(Self {
            file: unsafe { File::from_raw_fd(fd) },
        })
    }

    /// Reports one assertion failure: source file, line number, qualified
    /// test name, and the assertion message.
    pub fn report(&mut self, file: &str, line: u32, test_name: &str, message: &str) {
        let buf = format_failure(file, line, test_name, message);
        self.write(buf.as_bytes());
    }

    /// Writes the entire buffer to the sink. Interrupted writes are retried;
    /// a write error is fatal and the child exits with status 1.
    pub fn write(&mut self, buf: &[u8]) {
        // write_all retries on ErrorKind::Interrupted.
        if let Err(error) = self.file.write_all(buf) {
            eprintln!("failed to write {OUTPUT_FD_ENV}: {error}");
            std::process::exit(1);
        }
    }
}

fn format_failure(file: &str, line: u32, test_name: &str, message: &str) -> String {
    format!("{file}:({line}) Failure in test {test_name}\n{message}\n")
}
