// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable display of session events.

use super::{EventSink, events::*};
use crate::errors::WriteEventError;
use owo_colors::{OwoColorize, Style};
use std::{io, io::Write, time::Duration};

/// Builder for [`DisplayReporter`].
#[derive(Debug, Default)]
pub struct DisplayReporterBuilder {
    should_colorize: bool,
    verbose: bool,
}

impl DisplayReporterBuilder {
    /// Set to true if the reporter should colorize output.
    pub fn set_colorize(&mut self, should_colorize: bool) -> &mut Self {
        self.should_colorize = should_colorize;
        self
    }

    /// Set to true to also print case-started lines and per-case timing
    /// for passing cases' stderr.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Creates a reporter writing to `writer`.
    pub fn build<W: Write>(&self, writer: W) -> DisplayReporter<W> {
        let mut styles = Box::<Styles>::default();
        if self.should_colorize {
            styles.colorize();
        }
        DisplayReporter {
            writer,
            styles,
            verbose: self.verbose,
        }
    }
}

/// Functionality to display session events as human-readable text.
#[derive(Debug)]
pub struct DisplayReporter<W> {
    writer: W,
    styles: Box<Styles>,
    verbose: bool,
}

impl<W: Write> DisplayReporter<W> {
    fn write_event_impl(&mut self, event: &SessionEvent) -> io::Result<()> {
        match &event.kind {
            SessionEventKind::SessionStarted {
                total_cases,
                selected,
            } => {
                write!(
                    self.writer,
                    "{:>12} ",
                    "Starting".style(self.styles.pass)
                )?;
                if selected == total_cases {
                    writeln!(
                        self.writer,
                        "{} {}",
                        selected.style(self.styles.count),
                        plural::cases_str(*selected),
                    )?;
                } else {
                    writeln!(
                        self.writer,
                        "{} of {} {}",
                        selected.style(self.styles.count),
                        total_cases.style(self.styles.count),
                        plural::cases_str(*total_cases),
                    )?;
                }
            }
            SessionEventKind::BuildStarted { program, source } => {
                writeln!(
                    self.writer,
                    "{:>12} {source} with {program}",
                    "Compiling".style(self.styles.pass),
                )?;
            }
            SessionEventKind::BuildFinished {
                artifact,
                time_taken,
            } => {
                write!(
                    self.writer,
                    "{:>12} ",
                    "Compiled".style(self.styles.pass)
                )?;
                self.write_duration(*time_taken)?;
                writeln!(self.writer, "{artifact}")?;
            }
            SessionEventKind::BuildFailed {
                diagnostics,
                time_taken,
            } => {
                write!(
                    self.writer,
                    "{:>12} ",
                    "BUILD FAIL".style(self.styles.fail)
                )?;
                self.write_duration(*time_taken)?;
                writeln!(self.writer)?;
                self.write_block("compiler diagnostics", diagnostics)?;
            }
            SessionEventKind::CaseStarted { case_index, .. } => {
                if self.verbose {
                    writeln!(
                        self.writer,
                        "{:>12} case {}",
                        "START".style(self.styles.count),
                        case_index.style(self.styles.count),
                    )?;
                }
            }
            SessionEventKind::CaseFinished {
                case_index, status, ..
            } => {
                self.write_status_line(*case_index, status)?;
            }
            SessionEventKind::SessionFinished {
                run_stats,
                cancelled,
                ..
            } => {
                self.write_summary(run_stats, *cancelled, event.elapsed)?;
            }
        }
        Ok(())
    }

    fn write_status_line(&mut self, case_index: usize, status: &CaseStatus) -> io::Result<()> {
        let (label, style) = match status.result {
            ExecutionResult::Pass => ("PASS", self.styles.pass),
            ExecutionResult::Fail => ("FAIL", self.styles.fail),
            ExecutionResult::Timeout => ("TIMEOUT", self.styles.fail),
            ExecutionResult::ExecFail => ("EXEC FAIL", self.styles.fail),
            ExecutionResult::Malformed => ("MALFORMED", self.styles.fail),
        };
        write!(self.writer, "{:>12} ", label.style(style))?;
        self.write_duration(status.time_taken)?;
        writeln!(self.writer, "case {}", case_index.style(self.styles.count))?;

        if let Some(detail) = &status.error_detail {
            writeln!(self.writer, "{:>12} {detail}", "")?;
        }
        if let Some(output) = &status.output {
            self.write_block("expected", &output.expected)?;
            self.write_block("actual (stdout)", &output.stdout)?;
            if !output.stderr.is_empty() {
                self.write_block("stderr", &output.stderr)?;
            }
        }
        Ok(())
    }

    fn write_summary(
        &mut self,
        stats: &RunStats,
        cancelled: bool,
        elapsed: Duration,
    ) -> io::Result<()> {
        write!(self.writer, "{:>12} ", "Summary".style(self.styles.count))?;
        self.write_duration(elapsed)?;
        write!(
            self.writer,
            "{} {} run: {} passed, {} failed",
            stats.finished_count.style(self.styles.count),
            plural::cases_str(stats.finished_count),
            stats.passed.style(self.styles.pass),
            stats.failed.style(self.styles.fail),
        )?;
        if stats.timed_out > 0 {
            write!(
                self.writer,
                ", {} timed out",
                stats.timed_out.style(self.styles.fail)
            )?;
        }
        if stats.exec_failed > 0 {
            write!(
                self.writer,
                ", {} failed to start",
                stats.exec_failed.style(self.styles.fail)
            )?;
        }
        if stats.malformed > 0 {
            write!(
                self.writer,
                ", {} malformed",
                stats.malformed.style(self.styles.fail)
            )?;
        }
        if cancelled {
            write!(self.writer, " ({})", "cancelled".style(self.styles.fail))?;
        }
        writeln!(self.writer)
    }

    /// Writes a labeled block of verbatim text, e.g. compiler diagnostics
    /// or a failing case's output.
    fn write_block(&mut self, label: &str, text: &str) -> io::Result<()> {
        writeln!(self.writer, "--- {} ---", label.style(self.styles.count))?;
        if text.is_empty() {
            writeln!(self.writer, "(empty)")?;
        } else {
            self.writer.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                writeln!(self.writer)?;
            }
        }
        Ok(())
    }

    fn write_duration(&mut self, duration: Duration) -> io::Result<()> {
        // * > means right-align.
        // * 8 is the number of characters to pad to.
        // * .3 means print three digits after the decimal point.
        write!(self.writer, "[{:>8.3}s] ", duration.as_secs_f64())
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for DisplayReporter<W> {
    fn report_event(&mut self, event: SessionEvent) -> Result<(), WriteEventError> {
        self.write_event_impl(&event).map_err(WriteEventError::Io)
    }
}

#[derive(Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
    }
}

mod plural {
    pub(super) fn cases_str(n: usize) -> &'static str {
        if n == 1 { "case" } else { "cases" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use pretty_assertions::assert_eq;

    fn event(kind: SessionEventKind) -> SessionEvent {
        SessionEvent {
            timestamp: Local::now().fixed_offset(),
            elapsed: Duration::from_millis(1500),
            kind,
        }
    }

    fn render(events: Vec<SessionEventKind>) -> String {
        let mut reporter = DisplayReporterBuilder::default().build(Vec::new());
        for kind in events {
            reporter.report_event(event(kind)).unwrap();
        }
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn status_lines_and_summary() {
        let mut stats = RunStats {
            initial_run_count: 2,
            ..RunStats::default()
        };
        stats.on_case_finished(ExecutionResult::Pass);
        let mid_stats = stats;
        stats.on_case_finished(ExecutionResult::Fail);

        let out = render(vec![
            SessionEventKind::CaseFinished {
                case_index: 0,
                status: CaseStatus::pass(Duration::from_millis(42)),
                current_stats: mid_stats,
            },
            SessionEventKind::CaseFinished {
                case_index: 1,
                status: CaseStatus::fail(
                    Duration::from_millis(10),
                    CaseOutput {
                        stdout: "7".to_owned(),
                        stderr: String::new(),
                        expected: "6\n".to_owned(),
                    },
                ),
                current_stats: stats,
            },
            SessionEventKind::SessionFinished {
                start_time: Local::now().fixed_offset(),
                run_stats: stats,
                cancelled: false,
            },
        ]);

        assert!(out.contains("PASS"), "missing PASS line: {out}");
        assert!(out.contains("FAIL"), "missing FAIL line: {out}");
        assert!(out.contains("--- expected ---"), "missing expected block: {out}");
        assert!(out.contains("--- actual (stdout) ---"), "missing actual block: {out}");
        assert!(
            out.contains("2 cases run: 1 passed, 1 failed"),
            "missing summary: {out}"
        );
        assert!(!out.contains("stderr"), "empty stderr block should be omitted: {out}");
    }

    #[test]
    fn build_failure_prints_diagnostics_verbatim() {
        let out = render(vec![SessionEventKind::BuildFailed {
            diagnostics: "solution.cpp:3:1: error: expected `;`\n".to_owned(),
            time_taken: Duration::from_millis(80),
        }]);
        assert!(out.contains("BUILD FAIL"), "{out}");
        assert!(out.contains("solution.cpp:3:1: error: expected `;`"), "{out}");
    }

    #[test]
    fn cancelled_summary_is_flagged() {
        let stats = RunStats {
            initial_run_count: 3,
            finished_count: 1,
            passed: 1,
            ..RunStats::default()
        };
        let out = render(vec![SessionEventKind::SessionFinished {
            start_time: Local::now().fixed_offset(),
            run_stats: stats,
            cancelled: true,
        }]);
        assert!(out.contains("(cancelled)"), "{out}");
    }

    #[test]
    fn start_lines_only_in_verbose_mode() {
        let kind = SessionEventKind::CaseStarted {
            case_index: 0,
            current_stats: RunStats::default(),
        };

        let quiet = render(vec![kind.clone()]);
        assert_eq!(quiet, "");

        let mut builder = DisplayReporterBuilder::default();
        builder.set_verbose(true);
        let mut reporter = builder.build(Vec::new());
        reporter.report_event(event(kind)).unwrap();
        let verbose = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(verbose.contains("START"), "{verbose}");
    }
}
