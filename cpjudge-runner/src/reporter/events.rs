// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events emitted during a session.
//!
//! Events are produced by a [`SessionRunner`](crate::session::SessionRunner)
//! and consumed by an [`EventSink`](crate::reporter::EventSink).

use crate::case_list::MalformedCaseReason;
use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::time::Duration;

/// A session event.
#[derive(Clone, Debug)]
pub struct SessionEvent {
    /// The time at which the event was generated, including the offset
    /// from UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The amount of time elapsed since the start of the session.
    pub elapsed: Duration,

    /// The kind of event this is.
    pub kind: SessionEventKind,
}

/// The kind of session event this is.
///
/// Forms part of [`SessionEvent`].
#[derive(Clone, Debug)]
pub enum SessionEventKind {
    /// The session started.
    SessionStarted {
        /// The number of cases in the loaded list.
        total_cases: usize,

        /// The number of cases selected to run.
        selected: usize,
    },

    /// The build step started.
    BuildStarted {
        /// The compiler program.
        program: String,

        /// The source file being compiled.
        source: Utf8PathBuf,
    },

    /// The build step produced an artifact.
    BuildFinished {
        /// The path to the artifact.
        artifact: Utf8PathBuf,

        /// How long the compiler took.
        time_taken: Duration,
    },

    /// The build step failed. No cases will run and no further events
    /// follow for this session.
    BuildFailed {
        /// The compiler's diagnostic output, verbatim.
        diagnostics: String,

        /// How long the compiler took.
        time_taken: Duration,
    },

    /// A case started executing. Emitted before the child process is
    /// spawned so hosts can show an in-progress state.
    CaseStarted {
        /// The 0-based case index.
        case_index: usize,

        /// Statistics so far, not including this case.
        current_stats: RunStats,
    },

    /// A case reached its terminal state.
    CaseFinished {
        /// The 0-based case index.
        case_index: usize,

        /// The terminal status of the case.
        status: CaseStatus,

        /// Statistics so far, including this case.
        current_stats: RunStats,
    },

    /// The session finished. Always the last event when the build
    /// succeeded, even if the session was cancelled part-way.
    SessionFinished {
        /// The time at which the session started.
        start_time: DateTime<FixedOffset>,

        /// Final statistics. On cancellation these are partial: fewer
        /// cases finished than were initially selected.
        run_stats: RunStats,

        /// True if the session was cancelled between cases.
        cancelled: bool,
    },
}

/// The terminal result of executing a single case.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionResult {
    /// The output matched an accepted answer.
    Pass,

    /// The process ran to completion but no accepted answer matched.
    Fail,

    /// The process exceeded the timeout and was terminated.
    Timeout,

    /// The process could not be started.
    ExecFail,

    /// The case is missing required fields and was never executed.
    Malformed,
}

impl ExecutionResult {
    /// Returns true if this result counts as passing.
    pub fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// The terminal status of a single case, carried by
/// [`SessionEventKind::CaseFinished`].
#[derive(Clone, Debug)]
pub struct CaseStatus {
    /// How the case was judged.
    pub result: ExecutionResult,

    /// Wall-clock time from process start to exit (zero when the process
    /// never started).
    pub time_taken: Duration,

    /// Raw output, present only on [`ExecutionResult::Fail`].
    pub output: Option<CaseOutput>,

    /// Human-readable detail, present on `Timeout`, `ExecFail` and
    /// `Malformed`.
    pub error_detail: Option<String>,
}

impl CaseStatus {
    pub(crate) fn pass(time_taken: Duration) -> Self {
        Self {
            result: ExecutionResult::Pass,
            time_taken,
            output: None,
            error_detail: None,
        }
    }

    pub(crate) fn fail(time_taken: Duration, output: CaseOutput) -> Self {
        Self {
            result: ExecutionResult::Fail,
            time_taken,
            output: Some(output),
            error_detail: None,
        }
    }

    pub(crate) fn timeout(elapsed: Duration, detail: String) -> Self {
        Self {
            result: ExecutionResult::Timeout,
            time_taken: elapsed,
            output: None,
            error_detail: Some(detail),
        }
    }

    pub(crate) fn exec_fail(detail: String) -> Self {
        Self {
            result: ExecutionResult::ExecFail,
            time_taken: Duration::ZERO,
            output: None,
            error_detail: Some(detail),
        }
    }

    pub(crate) fn malformed(reason: MalformedCaseReason) -> Self {
        Self {
            result: ExecutionResult::Malformed,
            time_taken: Duration::ZERO,
            output: None,
            error_detail: Some(reason.to_string()),
        }
    }
}

/// Raw output retained for diagnosing a failed case without re-running it.
#[derive(Clone, Debug)]
pub struct CaseOutput {
    /// Everything the process wrote to stdout, undecoded by the matcher.
    pub stdout: String,

    /// Everything the process wrote to stderr.
    pub stderr: String,

    /// The first accepted answer, shown as "expected" by convention.
    pub expected: String,
}

/// Statistics for a session. Doubles as the final summary.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RunStats {
    /// The number of cases selected to run at the start of the session.
    ///
    /// If the session is cancelled, this stays greater than
    /// `finished_count`.
    pub initial_run_count: usize,

    /// The number of cases that reached a terminal state.
    pub finished_count: usize,

    /// The number of cases that passed.
    pub passed: usize,

    /// The number of cases whose output matched no accepted answer.
    pub failed: usize,

    /// The number of cases terminated on timeout.
    pub timed_out: usize,

    /// The number of cases whose process could not be started.
    pub exec_failed: usize,

    /// The number of cases that were missing required fields.
    pub malformed: usize,
}

impl RunStats {
    /// Returns true if every selected case finished and passed.
    pub fn is_success(&self) -> bool {
        self.finished_count == self.initial_run_count && !self.any_failed()
    }

    /// Returns true if any case reached a non-passing terminal state.
    pub fn any_failed(&self) -> bool {
        self.failed > 0 || self.timed_out > 0 || self.exec_failed > 0 || self.malformed > 0
    }

    pub(crate) fn on_case_finished(&mut self, result: ExecutionResult) {
        self.finished_count += 1;
        match result {
            ExecutionResult::Pass => self.passed += 1,
            ExecutionResult::Fail => self.failed += 1,
            ExecutionResult::Timeout => self.timed_out += 1,
            ExecutionResult::ExecFail => self.exec_failed += 1,
            ExecutionResult::Malformed => self.malformed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stats_accumulate_per_result() {
        let mut stats = RunStats {
            initial_run_count: 5,
            ..RunStats::default()
        };
        for result in [
            ExecutionResult::Pass,
            ExecutionResult::Fail,
            ExecutionResult::Timeout,
            ExecutionResult::ExecFail,
            ExecutionResult::Malformed,
        ] {
            stats.on_case_finished(result);
        }

        assert_eq!(stats.finished_count, 5);
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.exec_failed, 1);
        assert_eq!(stats.malformed, 1);
        assert!(stats.any_failed());
        assert!(!stats.is_success());
    }

    #[test]
    fn all_passed_is_success() {
        let mut stats = RunStats {
            initial_run_count: 2,
            ..RunStats::default()
        };
        stats.on_case_finished(ExecutionResult::Pass);
        assert!(!stats.is_success(), "one case still outstanding");
        stats.on_case_finished(ExecutionResult::Pass);
        assert!(stats.is_success());
    }

    #[test]
    fn cancelled_sessions_are_not_successes() {
        let mut stats = RunStats {
            initial_run_count: 3,
            ..RunStats::default()
        };
        stats.on_case_finished(ExecutionResult::Pass);
        // Two cases never ran.
        assert!(!stats.is_success());
        assert!(!stats.any_failed());
    }
}
