// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome status of a report entry.
///
/// Statuses are ordered by severity: when a group aggregates its children,
/// the most severe child status wins. The severity order, most severe first:
///
/// 1. [`Error`](Self::Error)
/// 2. [`Incomplete`](Self::Incomplete), [`XpassStrict`](Self::XpassStrict)
/// 3. [`Failed`](Self::Failed)
/// 4. [`Unknown`](Self::Unknown)
/// 5. [`Passed`](Self::Passed)
/// 6. [`Skipped`](Self::Skipped), [`Xfail`](Self::Xfail), [`Xpass`](Self::Xpass)
/// 7. [`Unstable`](Self::Unstable)
///
/// Statuses sharing a severity rank are incomparable: aggregating two
/// distinct same-rank statuses produces the representative status of their
/// category ([`Failed`](Self::Failed) or [`Unstable`](Self::Unstable)).
///
/// An absent status serializes as `null` and is modeled as `Option<Status>`.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, Hash, PartialEq)]
#[cfg_attr(any(test, feature = "proptest1"), derive(test_strategy::Arbitrary))]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// A framework error prevented the entry from producing a result.
    Error,
    /// Execution stopped before all assertions ran.
    Incomplete,
    /// An expected failure passed under strict checking.
    XpassStrict,
    /// At least one assertion failed.
    Failed,
    /// No result has been recorded.
    Unknown,
    /// All assertions passed.
    Passed,
    /// The entry was skipped.
    Skipped,
    /// The entry failed as expected.
    Xfail,
    /// An expected failure passed (non-strict).
    Xpass,
    /// The entry is known to be flaky.
    Unstable,
}

impl Status {
    /// Every status, in severity order.
    pub const ALL: &'static [Status] = &[
        Status::Error,
        Status::Incomplete,
        Status::XpassStrict,
        Status::Failed,
        Status::Unknown,
        Status::Passed,
        Status::Skipped,
        Status::Xfail,
        Status::Xpass,
        Status::Unstable,
    ];

    /// Returns the coarse category this status belongs to.
    ///
    /// The mapping is total: every status has a category.
    pub fn category(self) -> StatusCategory {
        match self {
            Status::Error | Status::Incomplete | Status::XpassStrict | Status::Failed => {
                StatusCategory::Failed
            }
            Status::Unknown => StatusCategory::Unknown,
            Status::Passed => StatusCategory::Passed,
            Status::Skipped | Status::Xfail | Status::Xpass | Status::Unstable => {
                StatusCategory::Unstable
            }
        }
    }

    /// Folds an iterator of statuses down to the one that takes precedence.
    ///
    /// Absent statuses are ignored; an empty or all-absent input produces
    /// `None`. Two distinct statuses on the same severity rank collapse to
    /// their category representative.
    pub fn precedent<I>(statuses: I) -> Option<Status>
    where
        I: IntoIterator<Item = Option<Status>>,
    {
        statuses
            .into_iter()
            .flatten()
            .fold(None, |acc, status| match acc {
                None => Some(status),
                Some(current) => Some(current.worse(status)),
            })
    }

    /// The wire name of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Error => "error",
            Status::Incomplete => "incomplete",
            Status::XpassStrict => "xpass-strict",
            Status::Failed => "failed",
            Status::Unknown => "unknown",
            Status::Passed => "passed",
            Status::Skipped => "skipped",
            Status::Xfail => "xfail",
            Status::Xpass => "xpass",
            Status::Unstable => "unstable",
        }
    }

    fn severity(self) -> u8 {
        match self {
            Status::Error => 0,
            Status::Incomplete | Status::XpassStrict => 1,
            Status::Failed => 2,
            Status::Unknown => 3,
            Status::Passed => 4,
            Status::Skipped | Status::Xfail | Status::Xpass => 5,
            Status::Unstable => 6,
        }
    }

    /// The status a tied severity rank collapses to.
    fn representative(self) -> Status {
        match self.severity() {
            1 => Status::Failed,
            5 => Status::Unstable,
            _ => self,
        }
    }

    fn worse(self, other: Status) -> Status {
        if self == other {
            self
        } else if self.severity() < other.severity() {
            self
        } else if other.severity() < self.severity() {
            other
        } else {
            self.representative()
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping of [`Status`] values, used for styling and summaries.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    /// The entry and all of its descendants passed.
    Passed,
    /// The entry failed, errored, or stopped early.
    Failed,
    /// The entry was skipped, expected to fail, or flaky.
    Unstable,
    /// No result is known.
    Unknown,
}

impl StatusCategory {
    /// The wire name of this category.
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCategory::Passed => "passed",
            StatusCategory::Failed => "failed",
            StatusCategory::Unstable => "unstable",
            StatusCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The interactive execution lifecycle of a report entry, independent of its
/// pass/fail outcome.
///
/// The declaration order is the precedence order: when a group aggregates its
/// children, the earliest-declared (most significant) status wins. A test
/// still [`Running`](Self::Running) dominates siblings that are
/// [`Finished`](Self::Finished).
///
/// Lifecycle for a single testcase: `Ready -> Running -> {Finished, NotRun}`,
/// with `Finished -> Resetting -> Ready` on user-triggered reset. `Waiting`
/// holds a testcase queued behind strict-order sequencing.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(any(test, feature = "proptest1"), derive(test_strategy::Arbitrary))]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStatus {
    /// Currently executing.
    Running,
    /// Being reset back to a runnable state.
    Resetting,
    /// Queued behind a prior sibling.
    Waiting,
    /// Eligible to run.
    Ready,
    /// Run requested but never executed (for example, cancelled).
    NotRun,
    /// Execution completed for this cycle.
    Finished,
}

impl RuntimeStatus {
    /// Folds an iterator of runtime statuses down to the most significant
    /// one. Absent statuses are ignored; an empty or all-absent input
    /// produces `None`.
    pub fn precedent<I>(statuses: I) -> Option<RuntimeStatus>
    where
        I: IntoIterator<Item = Option<RuntimeStatus>>,
    {
        statuses.into_iter().flatten().min()
    }

    /// True while a run or reset request is working through the entry.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            RuntimeStatus::Running | RuntimeStatus::Resetting | RuntimeStatus::Waiting
        )
    }

    /// True when a run request against this entry would be rejected.
    pub fn blocks_run(self) -> bool {
        matches!(self, RuntimeStatus::Resetting)
    }

    /// True when a reset request against this entry would be rejected.
    pub fn blocks_reset(self) -> bool {
        matches!(self, RuntimeStatus::Running | RuntimeStatus::Waiting)
    }

    /// The wire name of this runtime status.
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeStatus::Running => "running",
            RuntimeStatus::Resetting => "resetting",
            RuntimeStatus::Waiting => "waiting",
            RuntimeStatus::Ready => "ready",
            RuntimeStatus::NotRun => "not_run",
            RuntimeStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test]
    fn status_wire_names() {
        for &status in Status::ALL {
            let value = serde_json::to_value(status).expect("status serializes");
            assert_eq!(value, serde_json::Value::String(status.as_str().to_owned()));
            let back: Status = serde_json::from_value(value).expect("status deserializes");
            assert_eq!(back, status);
        }
    }

    #[test]
    fn status_unknown_wire_name_is_rejected() {
        let result = serde_json::from_value::<Status>(serde_json::json!("exploded"));
        result.expect_err("unmapped status must fail to deserialize");
    }

    #[test_case(Status::Error, StatusCategory::Failed)]
    #[test_case(Status::Incomplete, StatusCategory::Failed)]
    #[test_case(Status::XpassStrict, StatusCategory::Failed)]
    #[test_case(Status::Failed, StatusCategory::Failed)]
    #[test_case(Status::Unknown, StatusCategory::Unknown)]
    #[test_case(Status::Passed, StatusCategory::Passed)]
    #[test_case(Status::Skipped, StatusCategory::Unstable)]
    #[test_case(Status::Xfail, StatusCategory::Unstable)]
    #[test_case(Status::Xpass, StatusCategory::Unstable)]
    #[test_case(Status::Unstable, StatusCategory::Unstable)]
    fn status_category(status: Status, category: StatusCategory) {
        assert_eq!(status.category(), category);
    }

    #[test_case(&[], None; "empty input")]
    #[test_case(&[None, None], None; "all absent")]
    #[test_case(&[Some(Status::Passed), None], Some(Status::Passed); "absent is identity")]
    #[test_case(&[Some(Status::Passed), Some(Status::Failed)], Some(Status::Failed); "failed beats passed")]
    #[test_case(&[Some(Status::Failed), Some(Status::Error)], Some(Status::Error); "error beats failed")]
    #[test_case(&[Some(Status::Incomplete), Some(Status::Failed)], Some(Status::Incomplete); "incomplete beats failed")]
    #[test_case(&[Some(Status::Incomplete), Some(Status::XpassStrict)], Some(Status::Failed); "tied failed rank collapses")]
    #[test_case(&[Some(Status::Skipped), Some(Status::Xpass)], Some(Status::Unstable); "tied unstable rank collapses")]
    #[test_case(&[Some(Status::Passed), Some(Status::Skipped)], Some(Status::Passed); "passed beats skipped")]
    #[test_case(&[Some(Status::Unknown), Some(Status::Passed)], Some(Status::Unknown); "unknown beats passed")]
    fn status_precedent(statuses: &[Option<Status>], expected: Option<Status>) {
        assert_eq!(Status::precedent(statuses.iter().copied()), expected);
    }

    #[proptest(cases = 64)]
    fn worse_is_commutative(a: Status, b: Status) {
        assert_eq!(a.worse(b), b.worse(a));
    }

    #[proptest(cases = 64)]
    fn worse_never_loses_severity(a: Status, b: Status) {
        let combined = a.worse(b);
        let min = a.severity().min(b.severity());
        // The collapse of a tied rank lands on the category representative,
        // which sits exactly one rank below the tied inputs.
        assert!(combined.severity() >= min);
        assert!(combined.severity() <= min + 1);
    }

    #[proptest(cases = 64)]
    fn precedent_of_singleton(status: Status) {
        assert_eq!(Status::precedent([Some(status)]), Some(status));
        assert_eq!(status.worse(status), status);
    }

    #[test]
    fn runtime_status_wire_names() {
        let value = serde_json::to_value(RuntimeStatus::NotRun).expect("serializes");
        assert_eq!(value, serde_json::json!("not_run"));
        let back: RuntimeStatus =
            serde_json::from_value(serde_json::json!("resetting")).expect("deserializes");
        assert_eq!(back, RuntimeStatus::Resetting);
    }

    #[test_case(&[], None; "empty input")]
    #[test_case(&[Some(RuntimeStatus::Finished), Some(RuntimeStatus::Ready)], Some(RuntimeStatus::Ready); "ready beats finished")]
    #[test_case(&[Some(RuntimeStatus::Ready), Some(RuntimeStatus::Running)], Some(RuntimeStatus::Running); "running beats ready")]
    #[test_case(&[Some(RuntimeStatus::Finished), None, Some(RuntimeStatus::Waiting)], Some(RuntimeStatus::Waiting); "waiting beats finished")]
    fn runtime_precedent(statuses: &[Option<RuntimeStatus>], expected: Option<RuntimeStatus>) {
        assert_eq!(RuntimeStatus::precedent(statuses.iter().copied()), expected);
    }
}
