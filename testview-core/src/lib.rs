// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core logic for testview, a viewer for hierarchical test reports.
//!
//! This crate holds the viewer's domain logic, independent of any
//! particular frontend:
//!
//! - resolving selection paths against report trees ([`nav`])
//! - filtering the entries of a displayed level ([`filter`])
//! - deriving run actions for interactive execution ([`interactive`])
//! - encoding and decoding viewer routes ([`route`])
//! - fetching, polling and caching report documents ([`client`], [`store`])
//! - layered viewer configuration ([`config`])
//!
//! The report data model itself lives in the `testview-report` crate.

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod errors;
pub mod filter;
pub mod interactive;
pub mod nav;
pub mod route;
pub mod store;
