// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The cpjudge command-line interface.
//!
//! Compiles a single source file and judges it against a JSON file of
//! stdin/expected-output cases. See `cpjudge --help` for usage.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
