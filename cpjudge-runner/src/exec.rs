// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Child process execution with full output capture.
//!
//! [`execute`] spawns one child per call, feeds it the case input on
//! stdin, closes the pipe so EOF-driven programs terminate, and drains
//! stdout and stderr concurrently until the process exits. Capture is
//! complete; nothing is truncated.

use crate::{errors::ExecuteError, time::stopwatch};
use bytes::{Bytes, BytesMut};
use std::{
    borrow::Cow,
    io,
    process::{ExitStatus, Stdio},
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader},
    process::{Child, ChildStdin, Command},
};
use tracing::debug;

/// The size of each buffered reader's buffer.
///
/// This size is not totally arbitrary, but rather the (normal) page size
/// on most systems.
const CHUNK_SIZE: usize = 4 * 1024;

/// How long a terminated child gets to exit after SIGTERM before it is
/// killed outright.
#[cfg(unix)]
const TERMINATE_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// The complete captured output and status of a finished child process.
#[derive(Clone, Debug)]
pub struct ProcessOutput {
    /// Everything the process wrote to stdout.
    pub stdout: Bytes,

    /// Everything the process wrote to stderr.
    pub stderr: Bytes,

    /// The process exit status.
    pub exit_status: ExitStatus,

    /// Wall-clock time from spawn to exit. Display only; not enforced as
    /// a limit.
    pub time_taken: Duration,
}

impl ProcessOutput {
    /// Returns stdout as a lossy UTF-8 string.
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Returns stderr as a lossy UTF-8 string.
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Runs `program` with `args`, feeding `stdin_text` on stdin and capturing
/// both output streams until the process exits.
///
/// With a timeout, a process that runs too long is terminated (SIGTERM
/// then SIGKILL on Unix) rather than leaked, and the call fails with
/// [`ExecuteError::TimedOut`].
pub async fn execute(
    program: &str,
    args: &[String],
    stdin_text: &str,
    timeout: Option<Duration>,
) -> Result<ProcessOutput, ExecuteError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);

    let sw = stopwatch();
    let mut child = cmd.spawn().map_err(|error| ExecuteError::Launch {
        program: program.to_owned(),
        error,
    })?;
    debug!(program, "spawned child process");

    let stdin = child.stdin.take();
    let mut stdout = FusedBufReader::new(child.stdout.take().expect("stdout was piped"));
    let mut stderr = FusedBufReader::new(child.stderr.take().expect("stderr was piped"));
    let mut stdout_acc = BytesMut::with_capacity(CHUNK_SIZE);
    let mut stderr_acc = BytesMut::with_capacity(CHUNK_SIZE);

    let drive = drive_child(
        &mut child,
        stdin,
        stdin_text,
        &mut stdout,
        &mut stdout_acc,
        &mut stderr,
        &mut stderr_acc,
    );

    let drive_result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, drive).await {
            Ok(res) => res,
            Err(_) => {
                let elapsed = sw.snapshot().duration;
                debug!(program, ?elapsed, "timeout hit, terminating child");
                terminate_child(&mut child).await;
                return Err(ExecuteError::TimedOut { elapsed });
            }
        },
        None => drive.await,
    };
    let exit_status = match drive_result {
        Ok(exit_status) => exit_status,
        Err(error) => {
            // An I/O failure mid-run must not leave the child behind;
            // dropping a tokio Child does not kill it.
            terminate_child(&mut child).await;
            return Err(error);
        }
    };
    let time_taken = sw.snapshot().duration;

    Ok(ProcessOutput {
        stdout: stdout_acc.freeze(),
        stderr: stderr_acc.freeze(),
        exit_status,
        time_taken,
    })
}

/// Feeds stdin and drains both output streams until the child exits.
///
/// Stdin is written concurrently with the output drain: a program that
/// fills its stdout pipe before consuming all of its input must not
/// deadlock against us.
async fn drive_child(
    child: &mut Child,
    stdin: Option<ChildStdin>,
    stdin_text: &str,
    stdout: &mut FusedBufReader<tokio::process::ChildStdout>,
    stdout_acc: &mut BytesMut,
    stderr: &mut FusedBufReader<tokio::process::ChildStderr>,
    stderr_acc: &mut BytesMut,
) -> Result<ExitStatus, ExecuteError> {
    let mut stdin_fut = std::pin::pin!(feed_stdin(stdin, stdin_text));
    let mut stdin_done = false;

    loop {
        tokio::select! {
            res = stdin_fut.as_mut(), if !stdin_done => {
                res?;
                stdin_done = true;
            }
            res = stdout.fill_buf(stdout_acc), if !stdout.is_done() => {
                res.map_err(ExecuteError::Read)?;
            }
            res = stderr.fill_buf(stderr_acc), if !stderr.is_done() => {
                res.map_err(ExecuteError::Read)?;
            }
            // Output streams hit EOF once the child exits, so waiting
            // until both are done cannot hang.
            res = child.wait(), if stdout.is_done() && stderr.is_done() => {
                return res.map_err(ExecuteError::Wait);
            }
        }
    }
}

/// Writes the whole input to the child, then closes the pipe to signal
/// end-of-input.
async fn feed_stdin(stdin: Option<ChildStdin>, stdin_text: &str) -> Result<(), ExecuteError> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(stdin_text.as_bytes()).await {
        Ok(()) => {}
        // The child exited or closed stdin without reading everything.
        // That's its business; judge it on its output.
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => {
            debug!("child closed stdin early");
        }
        Err(error) => return Err(ExecuteError::Stdin(error)),
    }
    // Dropping the handle closes the write end of the pipe; a shutdown
    // error here means the child is already gone.
    let _ = stdin.shutdown().await;
    Ok(())
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        /// Terminates a timed-out child: SIGTERM to its process group, a
        /// grace period, then SIGKILL if it is still around.
        async fn terminate_child(child: &mut Child) {
            let Some(pid) = child.id() else {
                // Already reaped.
                return;
            };
            // Negative pid: signal the whole process group.
            let pid_for_kill = -(pid as i32);
            unsafe {
                libc::kill(pid_for_kill, libc::SIGTERM);
            }
            if tokio::time::timeout(TERMINATE_GRACE_PERIOD, child.wait())
                .await
                .is_err()
            {
                unsafe {
                    libc::kill(pid_for_kill, libc::SIGKILL);
                }
                let _ = child.wait().await;
            }
        }
    } else {
        async fn terminate_child(child: &mut Child) {
            let _ = child.kill().await;
        }
    }
}

/// A `BufReader` over an `AsyncRead` that tracks whether the stream has
/// hit EOF.
struct FusedBufReader<R> {
    reader: BufReader<R>,
    done: bool,
}

impl<R: AsyncRead + Unpin> FusedBufReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(CHUNK_SIZE, reader),
            done: false,
        }
    }

    async fn fill_buf(&mut self, acc: &mut BytesMut) -> Result<(), io::Error> {
        if self.done {
            return Ok(());
        }

        match self.reader.fill_buf().await {
            Ok(buf) => {
                acc.extend_from_slice(buf);
                if buf.is_empty() {
                    self.done = true;
                }
                let len = buf.len();
                self.reader.consume(len);
                Ok(())
            }
            Err(error) => {
                self.done = true;
                Err(error)
            }
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_feeds_stdin() {
        let output = execute("cat", &[], "hello\nworld\n", None)
            .await
            .expect("cat is available");
        assert_eq!(output.stdout_lossy(), "hello\nworld\n");
        assert_eq!(output.stderr_lossy(), "");
        assert!(output.exit_status.success());
    }

    #[tokio::test]
    async fn captures_stderr_separately() {
        let args = vec!["-c".to_owned(), "echo out; echo err >&2".to_owned()];
        let output = execute("sh", &args, "", None).await.expect("sh is available");
        assert_eq!(output.stdout_lossy(), "out\n");
        assert_eq!(output.stderr_lossy(), "err\n");
    }

    #[tokio::test]
    async fn ignoring_stdin_is_not_an_error() {
        // `true` never reads stdin; writing to it races with exit and may
        // hit a broken pipe, which must not fail the execution.
        let big_input = "x".repeat(1 << 20);
        let output = execute("true", &[], &big_input, None)
            .await
            .expect("broken pipe is tolerated");
        assert!(output.exit_status.success());
    }

    #[tokio::test]
    async fn launch_error_for_missing_program() {
        let err = execute("cpjudge-does-not-exist", &[], "", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecuteError::Launch { .. }));
    }

    #[tokio::test]
    async fn timeout_terminates_the_child() {
        let args = vec!["60".to_owned()];
        let start = std::time::Instant::now();
        let err = execute("sleep", &args, "", Some(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecuteError::TimedOut { .. }));
        // SIGTERM takes effect well within the grace period.
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn terminate_child_reaps_the_process() {
        // The cleanup used by both the timeout path and the mid-run
        // error path: the child must be gone afterwards, not leaked.
        let mut cmd = Command::new("sleep");
        cmd.arg("60")
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let mut child = cmd.spawn().expect("sleep is available");

        let start = std::time::Instant::now();
        terminate_child(&mut child).await;
        let status = child.wait().await.expect("child already reaped");
        assert!(!status.success());
        assert!(start.elapsed() < TERMINATE_GRACE_PERIOD);
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_in_status() {
        let args = vec!["-c".to_owned(), "exit 3".to_owned()];
        let output = execute("sh", &args, "", None).await.unwrap();
        assert_eq!(output.exit_status.code(), Some(3));
    }
}
