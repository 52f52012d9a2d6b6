// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::StderrStyles;
use cpjudge_runner::errors::{CaseListLoadError, SessionError, SessionRunnerBuildError};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;

/// Exit code when one or more cases did not pass.
pub const CASES_FAILED_EXIT_CODE: i32 = 100;

/// An error occurred in a program that we expected to run correctly.
///
/// These errors terminate the CLI with well-known exit codes rather than
/// a panic or a generic failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExpectedError {
    /// The case file could not be loaded.
    #[error("failed to load cases")]
    CaseListLoad {
        /// The underlying error.
        #[from]
        err: CaseListLoadError,
    },

    /// The `--timeout` value is not a positive number of seconds.
    #[error("invalid timeout `{value}`: expected a positive number of seconds")]
    InvalidTimeout {
        /// The rejected value.
        value: f64,
    },

    /// The session runner could not be constructed.
    #[error("failed to set up session")]
    SessionRunnerBuild {
        /// The underlying error.
        #[from]
        err: SessionRunnerBuildError,
    },

    /// The session aborted (build failure or invalid selection).
    #[error("session failed")]
    Session {
        /// The underlying error.
        #[from]
        err: SessionError,
    },
}

impl ExpectedError {
    /// Returns the process exit code for this error.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CaseListLoad { .. } => 102,
            Self::Session {
                err: SessionError::Build(_),
            } => 101,
            Self::Session { .. }
            | Self::SessionRunnerBuild { .. }
            | Self::InvalidTimeout { .. } => 1,
        }
    }

    /// Displays this error and its causes to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        eprintln!("{}: {}", "error".style(styles.error), self);
        let mut source = self.source();
        while let Some(error) = source {
            eprintln!("{}: {}", "caused by".style(styles.caused_by), error);
            source = error.source();
        }
    }
}
