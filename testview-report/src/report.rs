// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Counter, EnvStatus, RuntimeStatus, Status, StatusCategory};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag values grouped by tag-category name.
///
/// The untagged bucket conventionally uses the key `simple`.
pub type TagMap = IndexMap<String, Vec<String>>;

/// Measured execution intervals keyed by phase name, conventionally `run`.
///
/// Each phase holds one interval per attempt.
pub type Timer = IndexMap<String, Vec<TimeInterval>>;

/// One measured interval, in seconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct TimeInterval {
    /// When the interval opened.
    pub start: f64,
    /// When the interval closed, if it has.
    #[serde(default)]
    pub end: Option<f64>,
}

impl TimeInterval {
    /// Elapsed seconds, if the interval has closed.
    pub fn elapsed(&self) -> Option<f64> {
        self.end.map(|end| end - self.start)
    }
}

/// The structural category of a report entry.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// The root plan.
    #[serde(rename = "testplan")]
    Plan,
    /// A test instance (multitest) within a plan.
    #[serde(rename = "multitest")]
    Test,
    /// A suite within a test instance.
    #[serde(rename = "testsuite")]
    Suite,
    /// A group of parametrized testcases.
    Parametrization,
    /// A leaf testcase.
    #[serde(rename = "testcase")]
    Case,
    /// A framework-generated entry (setup, teardown, hooks).
    Synthesized,
    /// A placeholder for an entry that failed to run at all.
    Error,
}

impl Category {
    /// The wire name of this category.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Plan => "testplan",
            Category::Test => "multitest",
            Category::Suite => "testsuite",
            Category::Parametrization => "parametrization",
            Category::Case => "testcase",
            Category::Synthesized => "synthesized",
            Category::Error => "error",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error produced while addressing an entry of a report tree.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ReportTreeError {
    /// The uid path had no segments.
    #[error("empty uid path")]
    EmptyPath,
    /// A uid path segment did not match any child of the named parent.
    #[error("no entry with uid `{segment}` under `{parent}`")]
    EntryNotFound {
        /// Uid of the entry whose children were searched.
        parent: String,
        /// The segment that failed to match.
        segment: String,
    },
    /// The addressed entry does not carry an environment.
    #[error("entry `{uid}` does not track an environment")]
    NoEnvironment {
        /// Uid of the addressed entry.
        uid: String,
    },
}

/// One node of the report tree, tagged by its structural category.
///
/// Group categories (plan, test, suite, parametrization) wrap a
/// [`GroupReport`] and recurse through `entries`; leaf categories (case,
/// synthesized, error) wrap a [`CaseReport`] and terminate the recursion.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "category")]
pub enum ReportEntry {
    /// A nested plan node. In practice this appears only at the root,
    /// wrapped by [`TestReport`].
    #[serde(rename = "testplan")]
    Plan(GroupReport),
    /// A test instance.
    #[serde(rename = "multitest")]
    Test(GroupReport),
    /// A suite.
    #[serde(rename = "testsuite")]
    Suite(GroupReport),
    /// A parametrization group.
    #[serde(rename = "parametrization")]
    Parametrization(GroupReport),
    /// A testcase.
    #[serde(rename = "testcase")]
    Case(CaseReport),
    /// A framework-generated case, excluded from counters and sequencing.
    #[serde(rename = "synthesized")]
    Synthesized(CaseReport),
    /// An error placeholder for work that never ran.
    #[serde(rename = "error")]
    Error(CaseReport),
}

impl ReportEntry {
    /// The structural category of this entry.
    pub fn category(&self) -> Category {
        match self {
            ReportEntry::Plan(_) => Category::Plan,
            ReportEntry::Test(_) => Category::Test,
            ReportEntry::Suite(_) => Category::Suite,
            ReportEntry::Parametrization(_) => Category::Parametrization,
            ReportEntry::Case(_) => Category::Case,
            ReportEntry::Synthesized(_) => Category::Synthesized,
            ReportEntry::Error(_) => Category::Error,
        }
    }

    /// The entry's uid, unique among its siblings.
    pub fn uid(&self) -> &str {
        match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => &group.uid,
            ReportEntry::Case(case) | ReportEntry::Synthesized(case) | ReportEntry::Error(case) => {
                &case.uid
            }
        }
    }

    /// The entry's display name.
    pub fn name(&self) -> &str {
        match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => &group.name,
            ReportEntry::Case(case) | ReportEntry::Synthesized(case) | ReportEntry::Error(case) => {
                &case.name
            }
        }
    }

    /// The entry's effective outcome status: the override when present,
    /// otherwise the recorded status.
    pub fn status(&self) -> Option<Status> {
        match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => group.effective_status(),
            ReportEntry::Case(case) | ReportEntry::Synthesized(case) | ReportEntry::Error(case) => {
                case.effective_status()
            }
        }
    }

    /// The coarse category of the effective status, for styling.
    pub fn status_category(&self) -> Option<StatusCategory> {
        self.status().map(Status::category)
    }

    /// The entry's interactive execution state.
    pub fn runtime_status(&self) -> Option<RuntimeStatus> {
        match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => group.runtime_status,
            ReportEntry::Case(case) | ReportEntry::Synthesized(case) | ReportEntry::Error(case) => {
                case.runtime_status
            }
        }
    }

    /// The entry's aggregate counter.
    pub fn counter(&self) -> &Counter {
        match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => &group.counter,
            ReportEntry::Case(case) | ReportEntry::Synthesized(case) | ReportEntry::Error(case) => {
                &case.counter
            }
        }
    }

    /// The entry's tags.
    pub fn tags(&self) -> &TagMap {
        match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => &group.tags,
            ReportEntry::Case(case) | ReportEntry::Synthesized(case) | ReportEntry::Error(case) => {
                &case.tags
            }
        }
    }

    /// Total seconds spent in closed `run` intervals, if any were recorded.
    pub fn run_time(&self) -> Option<f64> {
        let timer = match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => &group.timer,
            ReportEntry::Case(case) | ReportEntry::Synthesized(case) | ReportEntry::Error(case) => {
                &case.timer
            }
        };
        let intervals = timer.get("run")?;
        let mut elapsed = intervals.iter().filter_map(TimeInterval::elapsed).peekable();
        elapsed.peek().is_some().then(|| elapsed.sum())
    }

    /// Child entries for navigation. Leaf entries have none, regardless of
    /// the assertion payloads they hold.
    pub fn child_entries(&self) -> &[ReportEntry] {
        self.as_group().map_or(&[], |group| &group.entries)
    }

    /// True for leaf entries: testcases, synthesized cases and error
    /// placeholders. Navigation does not drill below a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            ReportEntry::Case(_) | ReportEntry::Synthesized(_) | ReportEntry::Error(_)
        )
    }

    /// True if the entry has nothing to show: an empty counter for groups,
    /// no assertion payloads for leaves.
    pub fn is_empty(&self) -> bool {
        match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => group.counter.is_empty(),
            ReportEntry::Case(case) | ReportEntry::Synthesized(case) | ReportEntry::Error(case) => {
                case.entries.is_empty()
            }
        }
    }

    /// A view of the underlying group, for group categories.
    pub fn as_group(&self) -> Option<&GroupReport> {
        match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => Some(group),
            _ => None,
        }
    }

    /// A mutable view of the underlying group, for group categories.
    pub fn as_group_mut(&mut self) -> Option<&mut GroupReport> {
        match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => Some(group),
            _ => None,
        }
    }

    /// A view of the underlying case, for leaf categories.
    pub fn as_case(&self) -> Option<&CaseReport> {
        match self {
            ReportEntry::Case(case) | ReportEntry::Synthesized(case) | ReportEntry::Error(case) => {
                Some(case)
            }
            _ => None,
        }
    }

    /// Finds a direct child by uid. Returns the first match; sibling uids
    /// are unique in well-formed documents.
    pub fn find_child(&self, uid: &str) -> Option<&ReportEntry> {
        self.child_entries().iter().find(|entry| entry.uid() == uid)
    }

    fn find_child_mut(&mut self, uid: &str) -> Option<&mut ReportEntry> {
        self.as_group_mut()?
            .entries
            .iter_mut()
            .find(|entry| entry.uid() == uid)
    }

    fn assign_runtime_status(&mut self, status: RuntimeStatus) {
        match self {
            ReportEntry::Plan(group)
            | ReportEntry::Test(group)
            | ReportEntry::Suite(group)
            | ReportEntry::Parametrization(group) => {
                group.runtime_status = Some(status);
                for child in &mut group.entries {
                    child.assign_runtime_status(status);
                }
            }
            ReportEntry::Case(case) | ReportEntry::Synthesized(case) | ReportEntry::Error(case) => {
                case.runtime_status = Some(status);
            }
        }
    }
}

/// A grouping node: plan, test instance, suite or parametrization group.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct GroupReport {
    /// Display name.
    pub name: String,
    /// Identifier, unique among siblings.
    pub uid: String,
    /// Longer description, if the producer attached one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Aggregated outcome status. Serializes as `null` when absent.
    #[serde(default)]
    pub status: Option<Status>,
    /// Manual override that takes precedence over `status`.
    #[serde(default)]
    pub status_override: Option<Status>,
    /// Why the status was overridden or forced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    /// Aggregated interactive execution state.
    #[serde(default)]
    pub runtime_status: Option<RuntimeStatus>,
    /// Environment lifecycle. Present on test-instance entries that own an
    /// environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_status: Option<EnvStatus>,
    /// When set on a suite, children must execute in declaration order.
    #[serde(default)]
    pub strict_order: bool,
    /// Part `(index, total)` for test instances split across executions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<(u32, u32)>,
    /// Tag values grouped by tag category.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tags: TagMap,
    /// Measured execution intervals, keyed by phase.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub timer: Timer,
    /// Aggregate counts over descendant testcases.
    #[serde(default)]
    pub counter: Counter,
    /// Child entries in execution order.
    #[serde(default)]
    pub entries: Vec<ReportEntry>,
}

impl GroupReport {
    /// Creates an empty group with the given name and uid.
    pub fn new(name: impl Into<String>, uid: impl Into<String>) -> Self {
        GroupReport {
            name: name.into(),
            uid: uid.into(),
            status: Some(Status::Unknown),
            ..GroupReport::default()
        }
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Overrides the aggregated status.
    pub fn set_status_override(&mut self, status: Status) -> &mut Self {
        self.status_override = Some(status);
        self
    }

    /// Sets the reason attached to a status override.
    pub fn set_status_reason(&mut self, reason: impl Into<String>) -> &mut Self {
        self.status_reason = Some(reason.into());
        self
    }

    /// Sets the interactive execution state.
    pub fn set_runtime_status(&mut self, status: RuntimeStatus) -> &mut Self {
        self.runtime_status = Some(status);
        self
    }

    /// Sets the environment lifecycle status.
    pub fn set_env_status(&mut self, status: EnvStatus) -> &mut Self {
        self.env_status = Some(status);
        self
    }

    /// Requires children to execute in declaration order.
    pub fn set_strict_order(&mut self, strict_order: bool) -> &mut Self {
        self.strict_order = strict_order;
        self
    }

    /// Marks this group as one part of a split test instance.
    pub fn set_part(&mut self, index: u32, total: u32) -> &mut Self {
        self.part = Some((index, total));
        self
    }

    /// Adds a tag value under the given tag category.
    pub fn add_tag(&mut self, category: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.tags.entry(category.into()).or_default().push(value.into());
        self
    }

    /// Records a measured interval under the given phase key.
    pub fn add_interval(&mut self, phase: impl Into<String>, interval: TimeInterval) -> &mut Self {
        self.timer.entry(phase.into()).or_default().push(interval);
        self
    }

    /// Appends a child entry, updating this group's counter and aggregated
    /// statuses.
    ///
    /// Synthesized children are excluded from the counter; error children
    /// count once in the error bucket. All children participate in status
    /// aggregation.
    pub fn add_entry(&mut self, entry: ReportEntry) -> &mut Self {
        match &entry {
            ReportEntry::Error(_) => self.counter.record_error(),
            ReportEntry::Synthesized(_) => {}
            other => self.counter.merge(other.counter()),
        }
        self.entries.push(entry);
        self.status = Status::precedent(self.entries.iter().map(ReportEntry::status));
        self.runtime_status =
            RuntimeStatus::precedent(self.entries.iter().map(ReportEntry::runtime_status));
        self
    }

    /// The effective status: the override when present, otherwise the
    /// recorded status.
    pub fn effective_status(&self) -> Option<Status> {
        self.status_override.or(self.status)
    }

    /// Finds a direct child by uid.
    pub fn find_child(&self, uid: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|entry| entry.uid() == uid)
    }
}

/// A leaf entry. `entries` holds opaque assertion and log payloads; the
/// navigation recursion terminates here.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CaseReport {
    /// Display name.
    pub name: String,
    /// Identifier, unique among siblings.
    pub uid: String,
    /// Longer description, if the producer attached one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Outcome status. Serializes as `null` when absent.
    #[serde(default)]
    pub status: Option<Status>,
    /// Manual override that takes precedence over `status`.
    #[serde(default)]
    pub status_override: Option<Status>,
    /// Why the status was overridden or forced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    /// Interactive execution state.
    #[serde(default)]
    pub runtime_status: Option<RuntimeStatus>,
    /// Tag values grouped by tag category.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tags: TagMap,
    /// Measured execution intervals, keyed by phase.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub timer: Timer,
    /// This case's own contribution to parent counters.
    #[serde(default)]
    pub counter: Counter,
    /// Assertion and log payloads, opaque to the viewer core.
    #[serde(default)]
    pub entries: Vec<serde_json::Value>,
}

impl CaseReport {
    /// Creates a testcase with no recorded result yet.
    pub fn new(name: impl Into<String>, uid: impl Into<String>) -> Self {
        CaseReport {
            name: name.into(),
            uid: uid.into(),
            status: Some(Status::Unknown),
            counter: Counter::unit(Status::Unknown),
            ..CaseReport::default()
        }
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Records the outcome status, refreshing the case's counter bucket.
    pub fn set_status(&mut self, status: Status) -> &mut Self {
        self.status = Some(status);
        self.counter = Counter::unit(self.effective_status().unwrap_or(Status::Unknown));
        self
    }

    /// Overrides the outcome status, refreshing the case's counter bucket.
    pub fn set_status_override(&mut self, status: Status) -> &mut Self {
        self.status_override = Some(status);
        self.counter = Counter::unit(status);
        self
    }

    /// Sets the reason attached to a status override.
    pub fn set_status_reason(&mut self, reason: impl Into<String>) -> &mut Self {
        self.status_reason = Some(reason.into());
        self
    }

    /// Sets the interactive execution state.
    pub fn set_runtime_status(&mut self, status: RuntimeStatus) -> &mut Self {
        self.runtime_status = Some(status);
        self
    }

    /// Adds a tag value under the given tag category.
    pub fn add_tag(&mut self, category: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.tags.entry(category.into()).or_default().push(value.into());
        self
    }

    /// Records a measured interval under the given phase key.
    pub fn add_interval(&mut self, phase: impl Into<String>, interval: TimeInterval) -> &mut Self {
        self.timer.entry(phase.into()).or_default().push(interval);
        self
    }

    /// Appends an opaque assertion or log payload.
    pub fn add_assertion(&mut self, payload: serde_json::Value) -> &mut Self {
        self.entries.push(payload);
        self
    }

    /// The effective status: the override when present, otherwise the
    /// recorded status.
    pub fn effective_status(&self) -> Option<Status> {
        self.status_override.or(self.status)
    }
}

/// The root document for one test run: a plan entry plus run-level metadata.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TestReport {
    /// The plan node. Its `category` tag, statuses, counter and entries
    /// serialize inline at the document's top level.
    #[serde(flatten)]
    pub root: ReportEntry,
    /// Optional label distinguishing runs of the same plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// IANA timezone name the run was recorded in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Free-form metadata attached by the producer.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub meta: IndexMap<String, String>,
    /// Ordered key/value rows describing the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub information: Vec<(String, String)>,
    /// Attachment registry keyed by attachment uid.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attachments: IndexMap<String, serde_json::Value>,
}

impl TestReport {
    /// Creates an empty report whose root is a plan entry.
    pub fn new(name: impl Into<String>, uid: impl Into<String>) -> Self {
        TestReport {
            root: ReportEntry::Plan(GroupReport::new(name, uid)),
            label: None,
            timezone: None,
            meta: IndexMap::new(),
            information: Vec::new(),
            attachments: IndexMap::new(),
        }
    }

    /// The report uid, shared with the root plan entry.
    pub fn uid(&self) -> &str {
        self.root.uid()
    }

    /// The plan name.
    pub fn name(&self) -> &str {
        self.root.name()
    }

    /// The plan's effective status.
    pub fn status(&self) -> Option<Status> {
        self.root.status()
    }

    /// The plan's aggregate counter.
    pub fn counter(&self) -> &Counter {
        self.root.counter()
    }

    /// Top-level entries (test instances) under the plan.
    pub fn entries(&self) -> &[ReportEntry] {
        self.root.child_entries()
    }

    /// Sets the run label.
    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the recorded timezone.
    pub fn set_timezone(&mut self, timezone: impl Into<String>) -> &mut Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Appends an information row.
    pub fn add_information(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.information.push((key.into(), value.into()));
        self
    }

    /// Appends a top-level entry under the plan, updating plan aggregates.
    /// No-op if the root is not a group.
    pub fn add_entry(&mut self, entry: ReportEntry) -> &mut Self {
        if let Some(group) = self.root.as_group_mut() {
            group.add_entry(entry);
        }
        self
    }

    /// Finds a direct child of the plan by uid.
    pub fn find_entry(&self, uid: &str) -> Option<&ReportEntry> {
        self.root.find_child(uid)
    }

    /// Resolves an entry by full uid path. The first segment addresses the
    /// root plan itself.
    pub fn get_by_uid_path(&self, uid_path: &[&str]) -> Result<&ReportEntry, ReportTreeError> {
        let rest = self.check_root_segment(uid_path)?;
        let mut current = &self.root;
        for segment in rest {
            current = current
                .find_child(segment)
                .ok_or_else(|| ReportTreeError::EntryNotFound {
                    parent: current.uid().to_owned(),
                    segment: (*segment).to_owned(),
                })?;
        }
        Ok(current)
    }

    /// Returns a copy of this report with the runtime status of the entry at
    /// `uid_path` (and its whole subtree) replaced, and aggregated runtime
    /// statuses refreshed along the path. The original tree is untouched.
    pub fn with_runtime_status(
        &self,
        uid_path: &[&str],
        status: RuntimeStatus,
    ) -> Result<Self, ReportTreeError> {
        let mut updated = self.clone();
        let rest = self.check_root_segment(uid_path)?;
        update_runtime_on_path(&mut updated.root, rest, status)?;
        Ok(updated)
    }

    /// Returns a copy of this report with the environment status of the
    /// group entry at `uid_path` replaced. The original tree is untouched.
    pub fn with_env_status(
        &self,
        uid_path: &[&str],
        status: EnvStatus,
    ) -> Result<Self, ReportTreeError> {
        let mut updated = self.clone();
        let rest = self.check_root_segment(uid_path)?;
        update_env_on_path(&mut updated.root, rest, status)?;
        Ok(updated)
    }

    fn check_root_segment<'a, 'p>(
        &self,
        uid_path: &'a [&'p str],
    ) -> Result<&'a [&'p str], ReportTreeError> {
        let (first, rest) = uid_path.split_first().ok_or(ReportTreeError::EmptyPath)?;
        if self.root.uid() != *first {
            return Err(ReportTreeError::EntryNotFound {
                parent: String::new(),
                segment: (*first).to_owned(),
            });
        }
        Ok(rest)
    }
}

fn update_runtime_on_path(
    entry: &mut ReportEntry,
    path: &[&str],
    status: RuntimeStatus,
) -> Result<(), ReportTreeError> {
    let Some((segment, rest)) = path.split_first() else {
        entry.assign_runtime_status(status);
        return Ok(());
    };
    let parent = entry.uid().to_owned();
    let child = entry
        .find_child_mut(segment)
        .ok_or_else(|| ReportTreeError::EntryNotFound {
            parent,
            segment: (*segment).to_owned(),
        })?;
    update_runtime_on_path(child, rest, status)?;
    if let Some(group) = entry.as_group_mut() {
        group.runtime_status =
            RuntimeStatus::precedent(group.entries.iter().map(ReportEntry::runtime_status));
    }
    Ok(())
}

fn update_env_on_path(
    entry: &mut ReportEntry,
    path: &[&str],
    status: EnvStatus,
) -> Result<(), ReportTreeError> {
    let Some((segment, rest)) = path.split_first() else {
        let uid = entry.uid().to_owned();
        return match entry.as_group_mut() {
            Some(group) => {
                group.env_status = Some(status);
                Ok(())
            }
            None => Err(ReportTreeError::NoEnvironment { uid }),
        };
    };
    let parent = entry.uid().to_owned();
    let child = entry
        .find_child_mut(segment)
        .ok_or_else(|| ReportTreeError::EntryNotFound {
            parent,
            segment: (*segment).to_owned(),
        })?;
    update_env_on_path(child, rest, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn case(uid: &str, status: Status) -> ReportEntry {
        let mut case = CaseReport::new(uid, uid);
        case.set_status(status);
        ReportEntry::Case(case)
    }

    fn interactive_case(uid: &str, runtime: RuntimeStatus) -> ReportEntry {
        let mut case = CaseReport::new(uid, uid);
        case.set_status(Status::Unknown).set_runtime_status(runtime);
        ReportEntry::Case(case)
    }

    fn suite(uid: &str, entries: Vec<ReportEntry>) -> ReportEntry {
        let mut suite = GroupReport::new(uid, uid);
        for entry in entries {
            suite.add_entry(entry);
        }
        ReportEntry::Suite(suite)
    }

    fn sample_report() -> TestReport {
        let suite = suite(
            "alpha-suite",
            vec![
                case("case-pass", Status::Passed),
                case("case-fail", Status::Failed),
                case("case-skip", Status::Skipped),
            ],
        );
        let mut test = GroupReport::new("Alpha", "alpha");
        test.set_env_status(EnvStatus::Stopped).add_entry(suite);

        let mut report = TestReport::new("Nightly", "nightly");
        report.add_entry(ReportEntry::Test(test));
        report
    }

    #[test]
    fn add_entry_aggregates_counters_and_status() {
        let report = sample_report();
        let counter = report.counter();
        assert_eq!(counter.passed, 1);
        assert_eq!(counter.failed, 1);
        assert_eq!(counter.skipped, 1);
        assert_eq!(counter.total, 3);
        assert_eq!(report.status(), Some(Status::Failed));

        let test = report.find_entry("alpha").expect("test entry exists");
        assert_eq!(test.counter().total, 3);
        assert_eq!(test.status(), Some(Status::Failed));
    }

    #[test]
    fn synthesized_entries_skip_the_counter_but_not_the_status() {
        let mut teardown = CaseReport::new("teardown", "teardown");
        teardown.set_status(Status::Error);

        let mut suite = GroupReport::new("s", "s");
        suite
            .add_entry(case("ok", Status::Passed))
            .add_entry(ReportEntry::Synthesized(teardown));

        assert_eq!(suite.counter.total, 1);
        assert_eq!(suite.counter.passed, 1);
        assert_eq!(suite.counter.error, 0);
        // The teardown error still dominates the aggregated status.
        assert_eq!(suite.effective_status(), Some(Status::Error));
    }

    #[test]
    fn error_entries_count_once_in_the_error_bucket() {
        let mut placeholder = CaseReport::new("crashed", "crashed");
        placeholder.set_status(Status::Error);

        let mut plan = GroupReport::new("p", "p");
        plan.add_entry(case("ok", Status::Passed))
            .add_entry(ReportEntry::Error(placeholder));

        assert_eq!(plan.counter.error, 1);
        assert_eq!(plan.counter.total, 2);
        assert!(plan.counter.has_failures());
    }

    #[test]
    fn status_override_takes_precedence_and_refreshes_case_counters() {
        let mut case = CaseReport::new("flaky", "flaky");
        case.set_status(Status::Failed);
        case.set_status_override(Status::Xfail);
        assert_eq!(case.effective_status(), Some(Status::Xfail));
        assert_eq!(case.counter.xfail, 1);
        assert_eq!(case.counter.failed, 0);

        let mut suite = GroupReport::new("s", "s");
        suite.add_entry(ReportEntry::Case(case));
        suite.set_status_override(Status::Passed);
        assert_eq!(suite.effective_status(), Some(Status::Passed));
        assert_eq!(suite.status, Some(Status::Xfail));
    }

    #[test]
    fn category_tags_round_trip() {
        let report = sample_report();
        let value = serde_json::to_value(&report).expect("report serializes");

        assert_eq!(value["category"], serde_json::json!("testplan"));
        assert_eq!(value["entries"][0]["category"], serde_json::json!("multitest"));
        assert_eq!(
            value["entries"][0]["entries"][0]["category"],
            serde_json::json!("testsuite")
        );
        assert_eq!(value["entries"][0]["env_status"], serde_json::json!("STOPPED"));
        // Absent runtime status is an explicit null in group documents.
        assert_eq!(value["runtime_status"], serde_json::Value::Null);

        let back: TestReport = serde_json::from_value(value).expect("report deserializes");
        assert_eq!(back, report);
    }

    #[test]
    fn unknown_categories_fail_to_deserialize() {
        let result = serde_json::from_value::<ReportEntry>(serde_json::json!({
            "category": "mystery",
            "name": "x",
            "uid": "x",
        }));
        result.expect_err("unmapped category must fail to deserialize");
    }

    #[test]
    fn sparse_backend_documents_deserialize() {
        // Trimmed-down shape of a backend report: null statuses, missing
        // entries arrays, sparse counters.
        let report: TestReport = serde_json::from_value(serde_json::json!({
            "category": "testplan",
            "name": "Plan",
            "uid": "plan-1",
            "status": null,
            "status_override": null,
            "runtime_status": null,
            "timezone": "Europe/London",
            "entries": [
                {
                    "category": "multitest",
                    "name": "Suite runner",
                    "uid": "mt-1",
                    "status": "passed",
                    "counter": {"passed": 2, "failed": 0, "total": 2},
                }
            ],
        }))
        .expect("backend document deserializes");

        assert_eq!(report.uid(), "plan-1");
        assert_eq!(report.timezone.as_deref(), Some("Europe/London"));
        let test = report.find_entry("mt-1").expect("test entry exists");
        assert_eq!(test.status(), Some(Status::Passed));
        assert!(test.child_entries().is_empty());
    }

    #[test]
    fn get_by_uid_path_walks_the_tree() {
        let report = sample_report();
        let entry = report
            .get_by_uid_path(&["nightly", "alpha", "alpha-suite", "case-fail"])
            .expect("path resolves");
        assert_eq!(entry.status(), Some(Status::Failed));

        let err = report
            .get_by_uid_path(&["nightly", "alpha", "missing"])
            .expect_err("unknown segment fails");
        assert_eq!(
            err,
            ReportTreeError::EntryNotFound {
                parent: "alpha".to_owned(),
                segment: "missing".to_owned(),
            }
        );
    }

    #[test]
    fn with_runtime_status_leaves_the_original_untouched() {
        let mut report = TestReport::new("Plan", "plan");
        let suite = suite(
            "s1",
            vec![
                interactive_case("c1", RuntimeStatus::Finished),
                interactive_case("c2", RuntimeStatus::Ready),
            ],
        );
        let mut test = GroupReport::new("mt", "mt");
        test.add_entry(suite);
        report.add_entry(ReportEntry::Test(test));

        let updated = report
            .with_runtime_status(&["plan", "mt", "s1", "c2"], RuntimeStatus::Waiting)
            .expect("path resolves");

        let original_case = report
            .get_by_uid_path(&["plan", "mt", "s1", "c2"])
            .expect("original path resolves");
        assert_eq!(original_case.runtime_status(), Some(RuntimeStatus::Ready));

        let updated_case = updated
            .get_by_uid_path(&["plan", "mt", "s1", "c2"])
            .expect("updated path resolves");
        assert_eq!(updated_case.runtime_status(), Some(RuntimeStatus::Waiting));

        // Aggregates refresh along the path: waiting dominates finished.
        let updated_suite = updated
            .get_by_uid_path(&["plan", "mt", "s1"])
            .expect("suite resolves");
        assert_eq!(updated_suite.runtime_status(), Some(RuntimeStatus::Waiting));
        assert_eq!(updated.root.runtime_status(), Some(RuntimeStatus::Waiting));
    }

    #[test]
    fn with_runtime_status_spreads_over_a_group_subtree() {
        let report = sample_report();
        let updated = report
            .with_runtime_status(&["nightly", "alpha"], RuntimeStatus::Resetting)
            .expect("path resolves");
        let case = updated
            .get_by_uid_path(&["nightly", "alpha", "alpha-suite", "case-pass"])
            .expect("case resolves");
        assert_eq!(case.runtime_status(), Some(RuntimeStatus::Resetting));
    }

    #[test]
    fn run_time_sums_closed_run_intervals() {
        let mut case = CaseReport::new("timed", "timed");
        case.set_status(Status::Passed)
            .add_interval("run", TimeInterval { start: 10.0, end: Some(12.5) })
            .add_interval("run", TimeInterval { start: 20.0, end: Some(21.0) })
            .add_interval("run", TimeInterval { start: 30.0, end: None })
            .add_interval("setup", TimeInterval { start: 0.0, end: Some(5.0) });
        let entry = ReportEntry::Case(case);
        assert_eq!(entry.run_time(), Some(3.5));

        let untimed = ReportEntry::Case(CaseReport::new("untimed", "untimed"));
        assert_eq!(untimed.run_time(), None);
    }

    #[test]
    fn with_env_status_rejects_leaf_targets() {
        let report = sample_report();

        let updated = report
            .with_env_status(&["nightly", "alpha"], EnvStatus::Starting)
            .expect("test target accepts env update");
        let test = updated.find_entry("alpha").expect("test entry exists");
        assert_eq!(test.as_group().and_then(|g| g.env_status), Some(EnvStatus::Starting));

        let err = report
            .with_env_status(
                &["nightly", "alpha", "alpha-suite", "case-pass"],
                EnvStatus::Starting,
            )
            .expect_err("leaf target is rejected");
        assert_eq!(err, ReportTreeError::NoEnvironment { uid: "case-pass".to_owned() });
    }
}
