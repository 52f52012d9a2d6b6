// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session orchestrator.
//!
//! A session is one build-then-run invocation of the harness: compile the
//! source, then run the selected cases strictly sequentially in index
//! order, pushing an event into the sink as each case starts and
//! finishes. [`SessionRunner::execute`] is a blocking call bounded by
//! compile time plus the per-case process times; hosts that need to stay
//! responsive wrap it in their own thread or task.

use crate::{
    case_list::{CaseList, TestCase},
    compile::{BuildArtifact, Toolchain},
    errors::{ExecuteError, SessionError, SessionRunnerBuildError},
    exec,
    matcher,
    reporter::{
        EventSink,
        events::{CaseOutput, CaseStatus, RunStats, SessionEvent, SessionEventKind},
    },
    time::{StopwatchStart, stopwatch},
};
use camino::Utf8Path;
use chrono::Local;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::runtime::Runtime;
use tracing::debug;

/// Which cases of the list to run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaseSelection {
    /// Run every case, in index order.
    All,

    /// Run a single case by 0-based index. The build step still runs.
    Single(usize),
}

/// A handle that requests cancellation of a running session.
///
/// Cancellation is checked between cases: the currently-running child
/// always finishes (or is terminated on timeout) first, no further cases
/// are launched, and the session reports partial statistics.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns true if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Builder for [`SessionRunner`].
#[derive(Debug, Default)]
pub struct SessionRunnerBuilder {
    timeout: Option<Duration>,
    toolchain: Option<Toolchain>,
}

impl SessionRunnerBuilder {
    /// Sets the per-case timeout. No timeout is enforced by default.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Sets the toolchain used by the build step.
    pub fn set_toolchain(&mut self, toolchain: Toolchain) -> &mut Self {
        self.toolchain = Some(toolchain);
        self
    }

    /// Creates a new session runner.
    pub fn build(self) -> Result<SessionRunner, SessionRunnerBuildError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SessionRunnerBuildError::TokioRuntimeCreate)?;
        Ok(SessionRunner {
            runtime,
            timeout: self.timeout,
            toolchain: self.toolchain.unwrap_or_default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// Runs build-then-judge sessions against a source file.
#[derive(Debug)]
pub struct SessionRunner {
    runtime: Runtime,
    timeout: Option<Duration>,
    toolchain: Toolchain,
    cancelled: Arc<AtomicBool>,
}

impl SessionRunner {
    /// Returns a handle that can cancel this runner's session, from
    /// another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Runs one session: build `source` once, execute the selected cases,
    /// and stream events into `sink`.
    ///
    /// Blocks until every selected case has reached a terminal state (or
    /// the build fails, or the session is cancelled), then returns the
    /// final statistics. A failing build yields `SessionError::Build`
    /// after a single `BuildFailed` event; no case events are ever
    /// emitted for that session.
    ///
    /// Consumes the runner: a session runs at most once per runner, so a
    /// cancellation can never carry over into a later session.
    pub fn execute<S: EventSink>(
        self,
        source: &Utf8Path,
        case_list: &CaseList,
        selection: CaseSelection,
        sink: &mut S,
    ) -> Result<RunStats, SessionError> {
        self.runtime
            .block_on(self.execute_impl(source, case_list, selection, sink))
    }

    async fn execute_impl<S: EventSink>(
        &self,
        source: &Utf8Path,
        case_list: &CaseList,
        selection: CaseSelection,
        sink: &mut S,
    ) -> Result<RunStats, SessionError> {
        let selected: Vec<usize> = match selection {
            CaseSelection::All => (0..case_list.len()).collect(),
            CaseSelection::Single(index) => {
                if index >= case_list.len() {
                    return Err(SessionError::InvalidSelection {
                        index,
                        count: case_list.len(),
                    });
                }
                vec![index]
            }
        };

        let sw = stopwatch();
        let mut stats = RunStats {
            initial_run_count: selected.len(),
            ..RunStats::default()
        };

        sink.report_event(make_event(
            &sw,
            SessionEventKind::SessionStarted {
                total_cases: case_list.len(),
                selected: selected.len(),
            },
        ))?;

        sink.report_event(make_event(
            &sw,
            SessionEventKind::BuildStarted {
                program: self.toolchain.program.clone(),
                source: source.to_owned(),
            },
        ))?;
        let build_sw = stopwatch();
        let artifact = match self.toolchain.build(source).await {
            Ok(artifact) => {
                sink.report_event(make_event(
                    &sw,
                    SessionEventKind::BuildFinished {
                        artifact: artifact.path().to_owned(),
                        time_taken: build_sw.snapshot().duration,
                    },
                ))?;
                artifact
            }
            Err(error) => {
                sink.report_event(make_event(
                    &sw,
                    SessionEventKind::BuildFailed {
                        diagnostics: error.diagnostics(),
                        time_taken: build_sw.snapshot().duration,
                    },
                ))?;
                return Err(SessionError::Build(error));
            }
        };

        let mut was_cancelled = false;
        for &index in &selected {
            if self.cancelled.load(Ordering::Relaxed) {
                debug!(next_case = index, "cancellation requested, stopping");
                was_cancelled = true;
                break;
            }

            sink.report_event(make_event(
                &sw,
                SessionEventKind::CaseStarted {
                    case_index: index,
                    current_stats: stats,
                },
            ))?;

            let case = case_list
                .get(index)
                .expect("selection indexes were validated against the list");
            let status = self.run_case(case, &artifact).await;
            debug!(case_index = index, result = ?status.result, "case finished");

            stats.on_case_finished(status.result);
            sink.report_event(make_event(
                &sw,
                SessionEventKind::CaseFinished {
                    case_index: index,
                    status,
                    current_stats: stats,
                },
            ))?;
        }

        let snapshot = sw.snapshot();
        sink.report_event(SessionEvent {
            timestamp: Local::now().fixed_offset(),
            elapsed: snapshot.duration,
            kind: SessionEventKind::SessionFinished {
                start_time: snapshot.start_time.fixed_offset(),
                run_stats: stats,
                cancelled: was_cancelled,
            },
        })?;

        Ok(stats)
    }

    /// Executes one case against the artifact and judges it. Never fails
    /// the session: every problem becomes a terminal case state.
    async fn run_case(&self, case: &TestCase, artifact: &BuildArtifact) -> CaseStatus {
        let valid = match case.valid() {
            Ok(valid) => valid,
            Err(reason) => return CaseStatus::malformed(reason),
        };

        let invocation = artifact.invocation_path();
        match exec::execute(invocation.as_str(), &[], valid.input, self.timeout).await {
            Ok(output) => {
                let stdout = output.stdout_lossy();
                if matcher::matches(&stdout, valid.accepted) {
                    CaseStatus::pass(output.time_taken)
                } else {
                    CaseStatus::fail(
                        output.time_taken,
                        CaseOutput {
                            stdout: stdout.into_owned(),
                            stderr: output.stderr_lossy().into_owned(),
                            expected: matcher::expected_display(valid.accepted).to_owned(),
                        },
                    )
                }
            }
            Err(error @ ExecuteError::TimedOut { elapsed }) => {
                CaseStatus::timeout(elapsed, error.to_string())
            }
            Err(error) => CaseStatus::exec_fail(display_chain(&error)),
        }
    }
}

fn make_event(sw: &StopwatchStart, kind: SessionEventKind) -> SessionEvent {
    SessionEvent {
        timestamp: Local::now().fixed_offset(),
        elapsed: sw.snapshot().duration,
        kind,
    }
}

/// Renders an error and its source chain on one line, so launch failures
/// keep their underlying I/O detail.
fn display_chain(error: &dyn std::error::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
