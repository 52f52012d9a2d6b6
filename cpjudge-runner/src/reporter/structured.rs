// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Machine-readable reporting: one JSON object per line, one line per
//! event.

use super::{EventSink, events::*};
use crate::errors::WriteEventError;
use serde::Serialize;
use std::io::Write;

/// A sink that emits session events as JSON lines, for editor plugins and
/// other machine consumers.
#[derive(Debug)]
pub struct StructuredReporter<W> {
    writer: W,
}

impl<W: Write> StructuredReporter<W> {
    /// Creates a reporter writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for StructuredReporter<W> {
    fn report_event(&mut self, event: SessionEvent) -> Result<(), WriteEventError> {
        let record = Record::from_event(&event);
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

/// The serialized shape of an event. A stable shadow of
/// [`SessionEventKind`] so internal refactors don't silently change the
/// wire format.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum Record<'a> {
    SessionStarted {
        timestamp: String,
        total_cases: usize,
        selected: usize,
    },
    BuildStarted {
        timestamp: String,
        program: &'a str,
        source: &'a str,
    },
    BuildFinished {
        timestamp: String,
        artifact: &'a str,
        time_taken_ms: u128,
    },
    BuildFailed {
        timestamp: String,
        diagnostics: &'a str,
    },
    CaseStarted {
        timestamp: String,
        case_index: usize,
    },
    CaseFinished {
        timestamp: String,
        case_index: usize,
        result: ExecutionResult,
        time_taken_ms: u128,
        #[serde(skip_serializing_if = "Option::is_none")]
        stdout: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        expected: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
    },
    SessionFinished {
        timestamp: String,
        elapsed_ms: u128,
        cancelled: bool,
        stats: RunStats,
    },
}

impl<'a> Record<'a> {
    fn from_event(event: &'a SessionEvent) -> Self {
        let timestamp = event.timestamp.to_rfc3339();
        match &event.kind {
            SessionEventKind::SessionStarted {
                total_cases,
                selected,
            } => Record::SessionStarted {
                timestamp,
                total_cases: *total_cases,
                selected: *selected,
            },
            SessionEventKind::BuildStarted { program, source } => Record::BuildStarted {
                timestamp,
                program,
                source: source.as_str(),
            },
            SessionEventKind::BuildFinished {
                artifact,
                time_taken,
            } => Record::BuildFinished {
                timestamp,
                artifact: artifact.as_str(),
                time_taken_ms: time_taken.as_millis(),
            },
            SessionEventKind::BuildFailed { diagnostics, .. } => Record::BuildFailed {
                timestamp,
                diagnostics,
            },
            SessionEventKind::CaseStarted { case_index, .. } => Record::CaseStarted {
                timestamp,
                case_index: *case_index,
            },
            SessionEventKind::CaseFinished {
                case_index, status, ..
            } => Record::CaseFinished {
                timestamp,
                case_index: *case_index,
                result: status.result,
                time_taken_ms: status.time_taken.as_millis(),
                stdout: status.output.as_ref().map(|o| o.stdout.as_str()),
                stderr: status.output.as_ref().map(|o| o.stderr.as_str()),
                expected: status.output.as_ref().map(|o| o.expected.as_str()),
                error: status.error_detail.as_deref(),
            },
            SessionEventKind::SessionFinished {
                run_stats,
                cancelled,
                ..
            } => Record::SessionFinished {
                timestamp,
                elapsed_ms: event.elapsed.as_millis(),
                cancelled: *cancelled,
                stats: *run_stats,
            },
        }
    }
}
