// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run-action derivation for interactive mode.
//!
//! Levels under a strict-order suite get an explicit action per row: play
//! (clicking it triggers a run) or prohibit (the button is shown disabled).
//! Rows without a derived action are unrestricted. Actions live in a side
//! table keyed by uid, so the report tree itself stays untouched.

use crate::{errors::SelectionError, nav::Selection};
use indexmap::IndexMap;
use std::fmt;
use testview_report::{ReportEntry, RuntimeStatus};

/// What the run button of a row does.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// The row may be triggered.
    Play,
    /// The row is blocked: already running, or out of order in a
    /// strict-order suite.
    Prohibit,
}

impl Action {
    /// Lowercase name, for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Play => "play",
            Action::Prohibit => "prohibit",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses one row in the action table.
///
/// Member cases of a parametrization group are keyed by the pair of group
/// uid and member uid, so a member can never collide with a same-named
/// direct child of the owning suite.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ActionKey {
    group: Option<String>,
    uid: String,
}

impl ActionKey {
    /// A direct child of the owning group.
    pub fn direct(uid: impl Into<String>) -> Self {
        ActionKey { group: None, uid: uid.into() }
    }

    /// A member case of a parametrization group.
    pub fn member(group: impl Into<String>, uid: impl Into<String>) -> Self {
        ActionKey {
            group: Some(group.into()),
            uid: uid.into(),
        }
    }
}

/// The derived action table for one displayed level.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ActionMap {
    actions: IndexMap<ActionKey, Action>,
}

impl ActionMap {
    /// Looks up the action for a key.
    pub fn get(&self, key: &ActionKey) -> Option<Action> {
        self.actions.get(key).copied()
    }

    /// Looks up the action for a direct child.
    pub fn direct(&self, uid: &str) -> Option<Action> {
        self.get(&ActionKey::direct(uid))
    }

    /// Looks up the action for a parametrization member.
    pub fn member(&self, group: &str, uid: &str) -> Option<Action> {
        self.get(&ActionKey::member(group, uid))
    }

    /// Iterates over all keyed actions in derivation order.
    pub fn iter(&self) -> impl Iterator<Item = (&ActionKey, Action)> {
        self.actions.iter().map(|(key, action)| (key, *action))
    }

    /// Number of keyed rows.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if no actions were derived.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Derives the action table for a selection.
///
/// The owning group is the nearest chain element that is neither a leaf nor
/// a parametrization; its children form the execution sequence, with
/// parametrization members flattened in one level deep and synthesized or
/// error entries skipped. Without strict ordering nothing is gated and the
/// table stays empty. With strict ordering only the first entry that has
/// not finished may play, and only if it is not in flight. A parametrization
/// group is playable exactly when one of its members is.
///
/// An empty selection derives an empty table.
pub fn compute_actions(selection: &Selection<'_>) -> Result<ActionMap, SelectionError> {
    let Some(tail) = selection.tail() else {
        return Ok(ActionMap::default());
    };
    let owner = selection
        .chain()
        .iter()
        .rev()
        .find(|entry| !entry.is_leaf() && !matches!(entry, ReportEntry::Parametrization(_)))
        .ok_or_else(|| SelectionError::MissingParent {
            uid: tail.uid().to_owned(),
        })?;
    if !owner.as_group().is_some_and(|group| group.strict_order) {
        return Ok(ActionMap::default());
    }

    let mut actions = IndexMap::new();
    let mut head_taken = false;
    for child in owner.child_entries() {
        match child {
            ReportEntry::Synthesized(_) | ReportEntry::Error(_) => {}
            ReportEntry::Parametrization(group) => {
                for member in &group.entries {
                    if matches!(member, ReportEntry::Synthesized(_) | ReportEntry::Error(_)) {
                        continue;
                    }
                    let action = sequence_action(member.runtime_status(), &mut head_taken);
                    actions.insert(ActionKey::member(group.uid.as_str(), member.uid()), action);
                }
            }
            other => {
                let action = sequence_action(other.runtime_status(), &mut head_taken);
                actions.insert(ActionKey::direct(other.uid()), action);
            }
        }
    }

    // Parametrization groups proxy their members: playable when any member
    // is, prohibited otherwise (including when empty).
    for child in owner.child_entries() {
        if let ReportEntry::Parametrization(group) = child {
            let any_play = group.entries.iter().any(|member| {
                actions.get(&ActionKey::member(group.uid.as_str(), member.uid()))
                    == Some(&Action::Play)
            });
            let action = if any_play { Action::Play } else { Action::Prohibit };
            actions.insert(ActionKey::direct(group.uid.as_str()), action);
        }
    }

    Ok(ActionMap { actions })
}

fn sequence_action(runtime: Option<RuntimeStatus>, head_taken: &mut bool) -> Action {
    if runtime == Some(RuntimeStatus::Finished) || *head_taken {
        return Action::Prohibit;
    }
    *head_taken = true;
    if runtime.is_some_and(RuntimeStatus::is_in_flight) {
        Action::Prohibit
    } else {
        Action::Play
    }
}

/// Pairs the displayed rows of a selection with their derived actions.
///
/// Rows that are not gated (everything outside strict-order suites, plus
/// synthesized and error entries) pair with `None`.
pub fn interactive_rows<'a>(
    selection: &Selection<'a>,
    actions: &ActionMap,
) -> Result<Vec<(&'a ReportEntry, Option<Action>)>, SelectionError> {
    let rows = selection.display_entries()?;
    let parent = match selection.tail() {
        Some(tail) if tail.is_leaf() => selection.parent_of_tail(),
        other => other,
    };
    let member_group = parent
        .filter(|parent| matches!(parent, ReportEntry::Parametrization(_)))
        .map(ReportEntry::uid);

    Ok(rows
        .iter()
        .map(|row| {
            let key = match member_group {
                Some(group) => ActionKey::member(group, row.uid()),
                None => ActionKey::direct(row.uid()),
            };
            (row, actions.get(&key))
        })
        .collect())
}
