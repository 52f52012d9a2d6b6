// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The build step: one compiler invocation producing the session's
//! artifact.
//!
//! The invocation follows a fixed template, `<program> <args..> <source>
//! -o <output>`, with the output path derived from the source path by
//! stripping its extension. One build per session; the artifact is shared
//! read-only by every case run.

use crate::errors::BuildError;
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// The compiler invocation used to produce a [`BuildArtifact`].
#[derive(Clone, Debug)]
pub struct Toolchain {
    /// The compiler program.
    pub program: String,

    /// Flags passed before the source path (e.g. the language-standard
    /// flag).
    pub args: Vec<String>,
}

impl Default for Toolchain {
    /// The single-file C++ toolchain the harness was built around.
    fn default() -> Self {
        Self::new("g++", ["-std=c++17", "-O2"])
    }
}

impl Toolchain {
    /// Creates a toolchain from a program and its fixed flags.
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Compiles `source`, returning the artifact on success.
    ///
    /// On a nonzero compiler exit, the compiler's diagnostic output is
    /// carried verbatim in [`BuildError::CompileFailed`].
    pub async fn build(&self, source: &Utf8Path) -> Result<BuildArtifact, BuildError> {
        let output_path = artifact_path(source)?;
        debug!(
            program = %self.program,
            %source,
            output = %output_path,
            "invoking compiler",
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .arg("-o")
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|error| BuildError::Launch {
                program: self.program.clone(),
                error,
            })?;

        if !output.status.success() {
            // Diagnostics usually arrive on stderr; append anything the
            // compiler printed to stdout so nothing is lost.
            let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stdout));
            return Err(BuildError::CompileFailed {
                exit_status: output.status,
                diagnostics,
            });
        }

        Ok(BuildArtifact { path: output_path })
    }
}

/// A compiled executable, valid for the duration of one session.
#[derive(Clone, Debug)]
pub struct BuildArtifact {
    path: Utf8PathBuf,
}

impl BuildArtifact {
    /// The path to the executable.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The path to pass to the process launcher.
    ///
    /// A bare file name would be looked up on `PATH` rather than in the
    /// working directory, so relative artifacts get a `./` prefix.
    pub fn invocation_path(&self) -> Utf8PathBuf {
        if self.path.as_str().contains(std::path::MAIN_SEPARATOR) {
            self.path.clone()
        } else {
            Utf8PathBuf::from(format!(".{}{}", std::path::MAIN_SEPARATOR, self.path))
        }
    }
}

fn artifact_path(source: &Utf8Path) -> Result<Utf8PathBuf, BuildError> {
    if source.extension().is_none() {
        return Err(BuildError::OutputPath {
            path: source.to_owned(),
        });
    }
    Ok(source.with_extension(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn artifact_path_strips_the_extension() {
        assert_eq!(
            artifact_path(Utf8Path::new("dir/solution.cpp")).unwrap(),
            Utf8PathBuf::from("dir/solution")
        );
        assert_eq!(
            artifact_path(Utf8Path::new("a.test.cc")).unwrap(),
            Utf8PathBuf::from("a.test")
        );
    }

    #[test]
    fn extensionless_source_is_rejected() {
        let err = artifact_path(Utf8Path::new("solution")).unwrap_err();
        assert!(matches!(err, BuildError::OutputPath { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn bare_artifact_names_get_a_local_prefix() {
        let artifact = BuildArtifact {
            path: Utf8PathBuf::from("solution"),
        };
        assert_eq!(artifact.invocation_path(), Utf8PathBuf::from("./solution"));

        let nested = BuildArtifact {
            path: Utf8PathBuf::from("dir/solution"),
        };
        assert_eq!(nested.invocation_path(), Utf8PathBuf::from("dir/solution"));
    }
}
