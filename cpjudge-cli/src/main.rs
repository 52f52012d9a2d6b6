// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use cpjudge_cli::CpjudgeApp;

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = enable_ansi_support::enable_ansi_support();

    let app = CpjudgeApp::parse();
    let styles = app.stderr_styles();

    match app.exec() {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&styles);
            std::process::exit(error.process_exit_code())
        }
    }
}
