// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core logic for cpjudge, a compile-run-verify harness for single-file
//! programs.
//!
//! A *session* compiles a source file once, then runs the produced
//! executable against an ordered list of test cases, feeding each case's
//! input on stdin and judging the captured output against one or more
//! accepted answers. Per-case results and a final tally are pushed into a
//! reporter sink as they happen, so a host (CLI, editor plugin, CI) can
//! show progress while the batch is still running.
//!
//! The main entry point is [`session::SessionRunner`].

#![warn(missing_docs)]

pub mod case_list;
pub mod compile;
pub mod errors;
pub mod exec;
pub mod matcher;
pub mod reporter;
pub mod session;
mod time;
