// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting of session results.
//!
//! The orchestrator pushes [`SessionEvent`]s into an [`EventSink`] as
//! they happen: zero or more case events followed by exactly one
//! session-finished event (or a build-failed event and nothing after).
//! Two sinks are provided, a human-readable [`DisplayReporter`] and a
//! JSON-lines [`StructuredReporter`]; hosts are free to bring their own.

mod displayer;
pub mod events;
mod structured;

pub use displayer::{DisplayReporter, DisplayReporterBuilder};
pub use structured::StructuredReporter;

use crate::errors::WriteEventError;
use events::SessionEvent;

/// A push-based, append-only receiver of session events.
///
/// Events arrive in deterministic order: cases are strictly sequential
/// and a case's finished event always follows its started event.
pub trait EventSink {
    /// Reports a single event.
    fn report_event(&mut self, event: SessionEvent) -> Result<(), WriteEventError>;
}

/// Collects events in memory. Useful for tests and embedding hosts that
/// do their own rendering.
impl EventSink for Vec<SessionEvent> {
    fn report_event(&mut self, event: SessionEvent) -> Result<(), WriteEventError> {
        self.push(event);
        Ok(())
    }
}
