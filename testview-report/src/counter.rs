// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Status;
use serde::{Deserialize, Serialize};

/// Aggregate outcome counts over an entry's descendant testcases.
///
/// `passed`, `failed` and `total` are always present on the wire; the other
/// buckets are omitted when zero. `total` is the sum of all buckets at every
/// level, and a parent's counter is the sum of its direct children's
/// counters. Builders maintain both invariants; fetched documents are
/// trusted as-is.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Counter {
    /// Count of passed testcases.
    #[serde(default)]
    pub passed: usize,
    /// Count of failed testcases.
    #[serde(default)]
    pub failed: usize,
    /// Count of testcases that hit a framework error.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub error: usize,
    /// Count of testcases that stopped before completing.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub incomplete: usize,
    /// Count of strict expected-failure passes.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub xpass_strict: usize,
    /// Count of testcases with no recorded result.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub unknown: usize,
    /// Count of skipped testcases.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub skipped: usize,
    /// Count of expected failures.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub xfail: usize,
    /// Count of non-strict expected-failure passes.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub xpass: usize,
    /// Count of testcases marked unstable.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub unstable: usize,
    /// Sum of all buckets.
    #[serde(default)]
    pub total: usize,
}

fn is_zero(count: &usize) -> bool {
    *count == 0
}

impl Counter {
    /// Creates an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter recording a single testcase with the given status.
    pub fn unit(status: Status) -> Self {
        let mut counter = Self::new();
        counter.record(status);
        counter
    }

    /// Records one testcase outcome.
    pub fn record(&mut self, status: Status) {
        *self.bucket_mut(status) += 1;
        self.total += 1;
    }

    /// Records one entry that errored before producing its own counts.
    pub fn record_error(&mut self) {
        self.error += 1;
        self.total += 1;
    }

    /// Adds another counter's buckets into this one.
    pub fn merge(&mut self, other: &Counter) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.error += other.error;
        self.incomplete += other.incomplete;
        self.xpass_strict += other.xpass_strict;
        self.unknown += other.unknown;
        self.skipped += other.skipped;
        self.xfail += other.xfail;
        self.xpass += other.xpass;
        self.unstable += other.unstable;
        self.total += other.total;
    }

    /// The bucket tracking the given status.
    pub fn bucket(&self, status: Status) -> usize {
        match status {
            Status::Passed => self.passed,
            Status::Failed => self.failed,
            Status::Error => self.error,
            Status::Incomplete => self.incomplete,
            Status::XpassStrict => self.xpass_strict,
            Status::Unknown => self.unknown,
            Status::Skipped => self.skipped,
            Status::Xfail => self.xfail,
            Status::Xpass => self.xpass,
            Status::Unstable => self.unstable,
        }
    }

    /// True if any descendant failed or errored.
    pub fn has_failures(&self) -> bool {
        self.failed + self.error > 0
    }

    /// True if no testcases have been counted.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    fn bucket_mut(&mut self, status: Status) -> &mut usize {
        match status {
            Status::Passed => &mut self.passed,
            Status::Failed => &mut self.failed,
            Status::Error => &mut self.error,
            Status::Incomplete => &mut self.incomplete,
            Status::XpassStrict => &mut self.xpass_strict,
            Status::Unknown => &mut self.unknown,
            Status::Skipped => &mut self.skipped,
            Status::Xfail => &mut self.xfail,
            Status::Xpass => &mut self.xpass,
            Status::Unstable => &mut self.unstable,
        }
    }
}
