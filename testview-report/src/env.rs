// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of the environment attached to a test-instance entry,
/// independent of the entry's runtime status.
///
/// The only permitted cycle is `Stopped -> Starting -> Started -> Stopping ->
/// Stopped`, with an early abort from `Starting` straight to `Stopping`.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, Hash, PartialEq)]
#[cfg_attr(any(test, feature = "proptest1"), derive(test_strategy::Arbitrary))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvStatus {
    /// The environment is down.
    Stopped,
    /// A start request is in progress.
    Starting,
    /// The environment is up.
    Started,
    /// A stop request is in progress.
    Stopping,
}

impl EnvStatus {
    /// Returns true if moving from this status to `next` is a permitted
    /// transition.
    pub fn can_transition(self, next: EnvStatus) -> bool {
        matches!(
            (self, next),
            (EnvStatus::Stopped, EnvStatus::Starting)
                | (EnvStatus::Starting, EnvStatus::Started)
                | (EnvStatus::Starting, EnvStatus::Stopping)
                | (EnvStatus::Started, EnvStatus::Stopping)
                | (EnvStatus::Stopping, EnvStatus::Stopped)
        )
    }

    /// The transition a start/stop toggle should request from this status,
    /// or `None` while a transition is already in flight.
    pub fn toggle_target(self) -> Option<EnvStatus> {
        match self {
            EnvStatus::Stopped => Some(EnvStatus::Starting),
            EnvStatus::Started => Some(EnvStatus::Stopping),
            EnvStatus::Starting | EnvStatus::Stopping => None,
        }
    }

    /// True while a start or stop is in progress.
    pub fn is_transitioning(self) -> bool {
        matches!(self, EnvStatus::Starting | EnvStatus::Stopping)
    }

    /// The wire name of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            EnvStatus::Stopped => "STOPPED",
            EnvStatus::Starting => "STARTING",
            EnvStatus::Started => "STARTED",
            EnvStatus::Stopping => "STOPPING",
        }
    }
}

impl fmt::Display for EnvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
