// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model for hierarchical test reports.
//!
//! A report is a tree: a plan contains test instances (multitests), which
//! contain suites, which contain testcases, possibly grouped one level deeper
//! under parametrization groups. Each node carries an outcome [`Status`], an
//! interactive [`RuntimeStatus`], and an aggregate [`Counter`]; testcases
//! terminate the recursion and hold opaque assertion payloads instead of
//! child entries.
//!
//! Serialization matches the JSON documents produced by the reporting
//! backend: entry categories are encoded in a `category` tag, statuses in
//! kebab-case, and absent statuses as `null`.

#![warn(missing_docs)]

mod counter;
mod env;
mod report;
mod status;

pub use counter::*;
pub use env::*;
pub use report::*;
pub use status::*;
