// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by cpjudge.

use camino::Utf8PathBuf;
use std::{io, process::ExitStatus, time::Duration};
use thiserror::Error;

/// An error that occurred while loading a case file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaseListLoadError {
    /// The file could not be read (missing, permissions, I/O error).
    #[error("failed to read case file `{path}`")]
    Read {
        /// The path to the case file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The file contents are not a JSON array of case objects.
    #[error("failed to parse case file `{path}`")]
    Parse {
        /// The path to the case file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}

/// An error that occurred while producing the build artifact.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// The source file has no extension, so stripping it would make the
    /// output path collide with the source itself.
    #[error("source file `{path}` has no extension to strip for the output path")]
    OutputPath {
        /// The path to the source file.
        path: Utf8PathBuf,
    },

    /// The compiler could not be started.
    #[error("failed to start compiler `{program}`")]
    Launch {
        /// The compiler program.
        program: String,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The compiler ran but exited nonzero.
    #[error("compiler exited with {exit_status}")]
    CompileFailed {
        /// The compiler's exit status.
        exit_status: ExitStatus,
        /// The compiler's diagnostic output, verbatim.
        diagnostics: String,
    },
}

impl BuildError {
    /// Returns the diagnostic text to surface to a reporting sink.
    ///
    /// For [`CompileFailed`](Self::CompileFailed) this is the compiler's
    /// output verbatim; for other variants it is the error message.
    pub fn diagnostics(&self) -> String {
        match self {
            Self::CompileFailed { diagnostics, .. } => diagnostics.clone(),
            other => other.to_string(),
        }
    }
}

/// An error that occurred while executing a child process.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecuteError {
    /// The program could not be started.
    #[error("failed to start `{program}`")]
    Launch {
        /// The program that failed to start.
        program: String,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The process exceeded its timeout and was terminated.
    #[error("process timed out after {elapsed:?}")]
    TimedOut {
        /// The wall-clock time at which the process was cut off.
        elapsed: Duration,
    },

    /// An error occurred while writing to the child's stdin.
    #[error("failed to write to child stdin")]
    Stdin(#[source] io::Error),

    /// An error occurred while reading the child's output streams.
    #[error("failed to read child output")]
    Read(#[source] io::Error),

    /// An error occurred while waiting for the child to exit.
    #[error("failed to wait for child exit")]
    Wait(#[source] io::Error),
}

/// An error that occurred while building a
/// [`SessionRunner`](crate::session::SessionRunner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionRunnerBuildError {
    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] io::Error),
}

/// An error that aborts a session.
///
/// Per-case failures are never session errors; they are reported as
/// terminal case states and the session continues.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// A single-case selection referred to an index past the end of the
    /// case list.
    #[error("case index {index} out of range ({count} cases)")]
    InvalidSelection {
        /// The requested index.
        index: usize,
        /// The number of cases in the list.
        count: usize,
    },

    /// The build step failed; no cases were run.
    #[error("build failed")]
    Build(#[from] BuildError),

    /// An error occurred while writing an event to the reporter sink.
    #[error("error reporting results")]
    Report(#[from] WriteEventError),
}

/// An error that occurred while writing an event to a sink.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to output.
    #[error("error writing event to output")]
    Io(#[from] io::Error),

    /// An error occurred while serializing the event to JSON.
    #[error("error serializing event to JSON")]
    Json(#[from] serde_json::Error),
}
