// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{CASES_FAILED_EXIT_CODE, ExpectedError},
    output::{OutputContext, OutputOpts, StderrStyles},
};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use cpjudge_runner::{
    case_list::{CaseList, ValidCase},
    compile::Toolchain,
    matcher::expected_display,
    reporter::{DisplayReporterBuilder, StructuredReporter},
    session::{CaseSelection, SessionRunnerBuilder},
};
use owo_colors::OwoColorize;
use std::time::Duration;

/// A compile-run-verify harness for single-file programs.
#[derive(Debug, Parser)]
#[command(
    name = "cpjudge",
    version,
    about = "Compile a single-file program and judge it against stdin/expected-output cases"
)]
pub struct CpjudgeApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl CpjudgeApp {
    /// Executes the app, returning the process exit code on success.
    pub fn exec(self) -> Result<i32, ExpectedError> {
        let output = self.output.init();
        match self.command {
            Command::Run(opts) => opts.exec(output),
            Command::List(opts) => opts.exec(output),
        }
    }

    /// Returns stderr styles for the parsed output options.
    pub fn stderr_styles(&self) -> StderrStyles {
        // Parsing happened before init; build a context just for styling.
        let context = OutputContext {
            verbose: self.output.verbose,
            color: self.output.color,
        };
        context.stderr_styles()
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a source file and run it against the cases
    Run(RunOpts),

    /// List the cases in a case file
    List(ListOpts),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MessageFormat {
    /// Human-readable status lines and a summary.
    #[default]
    Human,

    /// One JSON object per event, one per line.
    Json,
}

#[derive(Debug, clap::Args)]
struct RunOpts {
    /// Path to the source file to compile
    source: Utf8PathBuf,

    /// Path to the JSON case file
    #[arg(long, value_name = "FILE")]
    cases: Utf8PathBuf,

    /// Run only the case with this 0-based index
    #[arg(long, value_name = "INDEX")]
    case: Option<usize>,

    /// Per-case timeout in seconds (no timeout by default)
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,

    /// Compiler program to invoke
    #[arg(long, default_value = "g++", value_name = "PROG")]
    compiler: String,

    /// Compiler flag placed before the source path; may be repeated.
    /// Replaces the default `-std=c++17 -O2` when given
    #[arg(long = "compile-flag", value_name = "FLAG")]
    compile_flags: Vec<String>,

    /// Format of the result stream on stdout
    #[arg(long, value_enum, default_value_t, value_name = "FMT")]
    message_format: MessageFormat,
}

impl RunOpts {
    fn exec(self, output: OutputContext) -> Result<i32, ExpectedError> {
        let case_list = CaseList::load(&self.cases)?;
        let timeout = timeout_duration(self.timeout)?;

        let toolchain = if self.compile_flags.is_empty() {
            Toolchain::new(self.compiler, Toolchain::default().args)
        } else {
            Toolchain::new(self.compiler, self.compile_flags)
        };

        let mut builder = SessionRunnerBuilder::default();
        builder.set_timeout(timeout).set_toolchain(toolchain);
        let runner = builder.build()?;

        let selection = match self.case {
            Some(index) => CaseSelection::Single(index),
            None => CaseSelection::All,
        };

        let stdout = std::io::stdout().lock();
        let stats = match self.message_format {
            MessageFormat::Human => {
                let mut displayer_builder = DisplayReporterBuilder::default();
                displayer_builder
                    .set_colorize(
                        output
                            .color
                            .should_colorize(supports_color::Stream::Stdout),
                    )
                    .set_verbose(output.verbose);
                let mut reporter = displayer_builder.build(stdout);
                runner.execute(&self.source, &case_list, selection, &mut reporter)?
            }
            MessageFormat::Json => {
                let mut reporter = StructuredReporter::new(stdout);
                runner.execute(&self.source, &case_list, selection, &mut reporter)?
            }
        };

        if stats.is_success() {
            Ok(0)
        } else {
            Ok(CASES_FAILED_EXIT_CODE)
        }
    }
}

#[derive(Debug, clap::Args)]
struct ListOpts {
    /// Path to the JSON case file
    #[arg(long, value_name = "FILE")]
    cases: Utf8PathBuf,
}

impl ListOpts {
    fn exec(self, output: OutputContext) -> Result<i32, ExpectedError> {
        let case_list = CaseList::load(&self.cases)?;
        let styles = output.stderr_styles();

        for (index, case) in case_list.iter().enumerate() {
            match case.valid() {
                Ok(valid) => println!("{}", valid_case_line(index, valid)),
                Err(reason) => {
                    println!("{index:>4}: {} ({reason})", "malformed".style(styles.error));
                }
            }
        }
        Ok(0)
    }
}

/// Converts a user-supplied timeout in seconds to a `Duration`, rejecting
/// values a `Duration` cannot represent (negative, zero, NaN, infinite)
/// so they surface as a CLI error rather than a panic.
fn timeout_duration(secs: Option<f64>) -> Result<Option<Duration>, ExpectedError> {
    let Some(secs) = secs else {
        return Ok(None);
    };
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ExpectedError::InvalidTimeout { value: secs });
    }
    Ok(Some(Duration::from_secs_f64(secs)))
}

/// One listing line for a well-formed case: previews of the input and the
/// first accepted answer, plus a count of the alternatives.
fn valid_case_line(index: usize, case: ValidCase<'_>) -> String {
    let input = preview(case.input);
    let expected = preview(expected_display(case.accepted));
    match case.accepted.len() {
        1 => format!("{index:>4}: input {input:?}, expected {expected:?}"),
        n => format!(
            "{index:>4}: input {input:?}, expected {expected:?} (+{} more accepted)",
            n - 1
        ),
    }
}

/// First line of the input, truncated for display.
fn preview(input: &str) -> String {
    const MAX: usize = 40;
    let first_line = input.lines().next().unwrap_or_default();
    let mut preview: String = first_line.chars().take(MAX).collect();
    if first_line.chars().count() > MAX || input.lines().count() > 1 {
        preview.push('…');
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        CpjudgeApp::command().debug_assert();
    }

    #[test]
    fn timeout_must_be_a_positive_finite_number() {
        assert_eq!(timeout_duration(None).unwrap(), None);
        assert_eq!(
            timeout_duration(Some(1.5)).unwrap(),
            Some(Duration::from_millis(1500))
        );
        for bad in [-1.0, 0.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = timeout_duration(Some(bad)).unwrap_err();
            assert!(matches!(err, ExpectedError::InvalidTimeout { .. }), "{bad}");
            assert_eq!(err.process_exit_code(), 1);
        }
    }

    #[test]
    fn list_lines_preview_input_and_expected_answer() {
        let list = CaseList::from_json_str(
            r#"[
                {"test":"3\n","correct_answers":["6\n","6"]},
                {"test":"1 2\n","correct_answers":["3\n"]}
            ]"#,
        )
        .unwrap();

        let first = valid_case_line(0, list.get(0).unwrap().valid().unwrap());
        assert!(first.contains(r#"input "3""#), "{first}");
        assert!(first.contains(r#"expected "6""#), "{first}");
        assert!(first.contains("(+1 more accepted)"), "{first}");

        let second = valid_case_line(1, list.get(1).unwrap().valid().unwrap());
        assert!(second.contains(r#"expected "3""#), "{second}");
        assert!(!second.contains("more accepted"), "{second}");
    }

    #[test]
    fn preview_truncates_long_input() {
        assert_eq!(preview("3\n"), "3");
        assert_eq!(preview("1 2\n3 4\n"), "1 2…");
        let long = "x".repeat(100);
        assert!(preview(&long).ends_with('…'));
    }
}
