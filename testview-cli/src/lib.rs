// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A terminal viewer for hierarchical test reports.
//!
//! The `testview` binary renders report trees produced by a test-execution
//! backend: stored reports from a file or the batch API, or the live report
//! of an interactive session, which it can also drive (run, reset,
//! environment control).

#![warn(missing_docs)]

mod dispatch;
mod display;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use output::OutputWriter;
