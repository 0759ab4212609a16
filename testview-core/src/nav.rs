// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Selection resolution: from a uid path to breadcrumbs and display rows.

use crate::errors::SelectionError;
use std::fmt;
use testview_report::{ReportEntry, TestReport};

/// A selection within a report tree, as an ordered list of uid segments.
///
/// The first segment addresses the report root; an empty path selects
/// nothing.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct SelectionPath {
    segments: Vec<String>,
}

impl SelectionPath {
    /// The empty selection.
    pub fn new() -> Self {
        SelectionPath::default()
    }

    /// Appends a segment.
    pub fn push(&mut self, segment: impl Into<String>) -> &mut Self {
        self.segments.push(segment.into());
        self
    }

    /// Removes the last segment and returns it.
    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    /// The segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True if the path selects nothing.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

impl<S: Into<String>> FromIterator<S> for SelectionPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        SelectionPath {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<String>> for SelectionPath {
    fn from(segments: Vec<String>) -> Self {
        SelectionPath { segments }
    }
}

impl fmt::Display for SelectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// A selection path resolved against a concrete report tree.
///
/// Holds the chain of entries the path walks through, from the root down
/// to the selected entry. Resolution is loud: any segment that fails to
/// match is an error, never an empty result.
#[derive(Clone, Debug)]
pub struct Selection<'a> {
    chain: Vec<&'a ReportEntry>,
}

impl<'a> Selection<'a> {
    /// Resolves `path` against `report`.
    ///
    /// An empty path resolves to an empty chain. The first segment must
    /// match the report root; each further segment must match a child of
    /// the entry before it.
    pub fn resolve(report: &'a TestReport, path: &SelectionPath) -> Result<Self, SelectionError> {
        let Some((first, rest)) = path.segments().split_first() else {
            return Ok(Selection { chain: Vec::new() });
        };
        if report.uid() != first.as_str() {
            return Err(SelectionError::UnknownRoot {
                root: report.uid().to_owned(),
                segment: first.clone(),
            });
        }

        let mut chain = Vec::with_capacity(path.len());
        let mut current = &report.root;
        chain.push(current);
        for segment in rest {
            let child =
                current
                    .find_child(segment)
                    .ok_or_else(|| SelectionError::UnknownSegment {
                        parent: current.uid().to_owned(),
                        segment: segment.clone(),
                    })?;
            chain.push(child);
            current = child;
        }
        Ok(Selection { chain })
    }

    /// The resolved chain, from root to selected entry.
    pub fn chain(&self) -> &[&'a ReportEntry] {
        &self.chain
    }

    /// The selected entry, if the selection is non-empty.
    pub fn tail(&self) -> Option<&'a ReportEntry> {
        self.chain.last().copied()
    }

    /// True if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// The breadcrumb trail: the chain without a trailing leaf.
    ///
    /// Leaves are displayed as rows, not as breadcrumbs, so a selection
    /// ending on a testcase crumbs up to its parent.
    pub fn breadcrumbs(&self) -> &[&'a ReportEntry] {
        match self.chain.last() {
            Some(tail) if tail.is_leaf() => &self.chain[..self.chain.len() - 1],
            _ => &self.chain,
        }
    }

    /// The rows to display for this selection.
    ///
    /// For a group tail these are its children; for a leaf tail, the leaf's
    /// siblings. An empty selection displays nothing.
    pub fn display_entries(&self) -> Result<&'a [ReportEntry], SelectionError> {
        let Some(tail) = self.tail() else {
            return Ok(&[]);
        };
        if !tail.is_leaf() {
            return Ok(tail.child_entries());
        }
        match self.chain.len().checked_sub(2) {
            Some(index) => Ok(self.chain[index].child_entries()),
            None => Err(SelectionError::MissingParent {
                uid: tail.uid().to_owned(),
            }),
        }
    }

    /// The parent of the selected entry, if there is one.
    pub fn parent_of_tail(&self) -> Option<&'a ReportEntry> {
        let index = self.chain.len().checked_sub(2)?;
        Some(self.chain[index])
    }
}
