// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status filtering for displayed report entries.
//!
//! Filtering is shallow: it decides which entries of one navigation level
//! are shown, and never rewrites the tree underneath them. Navigation
//! re-applies the filter at each level it descends into.

use serde::{Deserialize, Serialize};
use std::fmt;
use testview_report::{ReportEntry, Status};

/// Which outcome class the viewer is focused on.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    /// Show every entry.
    #[default]
    All,
    /// Show entries that have passing testcases underneath them.
    Pass,
    /// Show entries that failed or errored, or contain such testcases.
    Fail,
}

impl FilterMode {
    /// The wire and query-string name of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Pass => "pass",
            FilterMode::Fail => "fail",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display toggles applied on top of the filter mode.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayOptions {
    /// Show entries with nothing underneath them.
    pub display_empty: bool,
    /// Show entries whose effective status is skipped.
    pub display_skipped: bool,
    /// Render tags next to entry names.
    pub display_tags: bool,
    /// Render measured run times next to entry names.
    pub display_time: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            display_empty: true,
            display_skipped: true,
            display_tags: false,
            display_time: false,
        }
    }
}

/// Selects the entries of one level that should be displayed.
///
/// Returns references into `entries` in their original order. An entry
/// passes the fail filter if its own effective status is failed or error,
/// or if its counter records failed or errored testcases; it passes the
/// pass filter if its counter records passing testcases. Display toggles
/// then drop empty and skipped entries when so configured.
pub fn apply_filter<'a>(
    entries: &'a [ReportEntry],
    mode: FilterMode,
    options: &DisplayOptions,
) -> Vec<&'a ReportEntry> {
    entries
        .iter()
        .filter(|entry| matches(entry, mode, options))
        .collect()
}

/// True if a single entry passes the filter mode and the display toggles.
pub fn matches(entry: &ReportEntry, mode: FilterMode, options: &DisplayOptions) -> bool {
    matches_mode(entry, mode)
        && (options.display_empty || !entry.is_empty())
        && (options.display_skipped || entry.status() != Some(Status::Skipped))
}

fn matches_mode(entry: &ReportEntry, mode: FilterMode) -> bool {
    match mode {
        FilterMode::All => true,
        FilterMode::Pass => entry.counter().passed > 0,
        FilterMode::Fail => {
            matches!(entry.status(), Some(Status::Error | Status::Failed))
                || entry.counter().has_failures()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;
    use test_strategy::proptest;
    use testview_report::{CaseReport, GroupReport};

    fn case(uid: &str, status: Status) -> ReportEntry {
        let mut case = CaseReport::new(uid, uid);
        case.set_status(status);
        ReportEntry::Case(case)
    }

    fn level() -> Vec<ReportEntry> {
        let mut failing_suite = GroupReport::new("failing", "failing");
        failing_suite
            .add_entry(case("f1", Status::Passed))
            .add_entry(case("f2", Status::Failed));

        let mut passing_suite = GroupReport::new("passing", "passing");
        passing_suite.add_entry(case("p1", Status::Passed));

        let mut skipped_suite = GroupReport::new("skipped", "skipped");
        skipped_suite.add_entry(case("s1", Status::Skipped));

        vec![
            ReportEntry::Suite(failing_suite),
            ReportEntry::Suite(passing_suite),
            ReportEntry::Suite(skipped_suite),
            ReportEntry::Suite(GroupReport::new("empty", "empty")),
            case("errored", Status::Error),
        ]
    }

    fn uids(selected: &[&ReportEntry]) -> Vec<String> {
        selected.iter().map(|entry| entry.uid().to_owned()).collect()
    }

    #[test_case(FilterMode::All, &["failing", "passing", "skipped", "empty", "errored"]; "all keeps everything")]
    #[test_case(FilterMode::Pass, &["failing", "passing"]; "pass keeps entries with passing cases")]
    #[test_case(FilterMode::Fail, &["failing", "errored"]; "fail keeps failures and errors")]
    fn filter_modes(mode: FilterMode, expected: &[&str]) {
        let entries = level();
        let selected = apply_filter(&entries, mode, &DisplayOptions::default());
        assert_eq!(uids(&selected), expected);
    }

    #[test]
    fn display_toggles_drop_empty_and_skipped_entries() {
        let entries = level();
        let options = DisplayOptions {
            display_empty: false,
            display_skipped: false,
            ..DisplayOptions::default()
        };
        let selected = apply_filter(&entries, FilterMode::All, &options);
        assert_eq!(uids(&selected), &["failing", "passing", "errored"]);
    }

    #[test]
    fn skipped_status_is_distinct_from_skip_counts() {
        // A suite whose aggregated status is skipped is hidden, but a suite
        // that merely contains skipped cases among others is not.
        let mut mixed = GroupReport::new("mixed", "mixed");
        mixed
            .add_entry(case("m1", Status::Passed))
            .add_entry(case("m2", Status::Skipped));
        let entries = vec![ReportEntry::Suite(mixed), case("lone-skip", Status::Skipped)];

        let options = DisplayOptions { display_skipped: false, ..DisplayOptions::default() };
        let selected = apply_filter(&entries, FilterMode::All, &options);
        assert_eq!(uids(&selected), &["mixed"]);
    }

    #[test]
    fn selection_is_by_reference_and_order_preserving() {
        let entries = level();
        let selected = apply_filter(&entries, FilterMode::Fail, &DisplayOptions::default());
        assert!(std::ptr::eq(selected[0], &entries[0]));
        assert!(std::ptr::eq(selected[1], &entries[4]));
    }

    #[test]
    fn status_override_participates_in_fail_filtering() {
        let mut waived = CaseReport::new("waived", "waived");
        waived.set_status(Status::Failed);
        waived.set_status_override(Status::Xfail);
        let entries = vec![ReportEntry::Case(waived)];

        let selected = apply_filter(&entries, FilterMode::Fail, &DisplayOptions::default());
        assert!(selected.is_empty());
    }

    #[test]
    fn fail_mode_keeps_exactly_the_failing_case() {
        let entries = vec![case("ok", Status::Passed), case("broken", Status::Failed)];
        let selected = apply_filter(&entries, FilterMode::Fail, &DisplayOptions::default());
        assert_eq!(uids(&selected), &["broken"]);
    }

    // Filtering decides membership only, so re-filtering what it returned
    // must change nothing.
    #[proptest(cases = 64)]
    fn filtering_is_idempotent(
        statuses: Vec<Status>,
        #[strategy(prop::sample::select(
            &[FilterMode::All, FilterMode::Pass, FilterMode::Fail][..],
        ))]
        mode: FilterMode,
    ) {
        let entries: Vec<ReportEntry> = statuses
            .iter()
            .enumerate()
            .map(|(index, &status)| case(&format!("c{index}"), status))
            .collect();
        let options = DisplayOptions::default();

        let once = apply_filter(&entries, mode, &options);
        let refiltered: Vec<ReportEntry> = once.iter().map(|&entry| entry.clone()).collect();
        let twice = apply_filter(&refiltered, mode, &options);

        prop_assert_eq!(uids(&once), uids(&twice));
    }
}
