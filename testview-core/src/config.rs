// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Viewer configuration, layered from embedded defaults and an optional
//! user config file.

use crate::{
    errors::ViewerConfigError,
    filter::{DisplayOptions, FilterMode},
    route::ViewQuery,
};
use camino::Utf8Path;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

/// The configuration embedded in the binary. Provides a value for every
/// supported key.
pub const DEFAULT_CONFIG: &str = include_str!("../default-config/testview.toml");

/// Top-level viewer configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ViewerConfig {
    /// Server connection settings.
    pub server: ServerConfig,
    /// Initial display settings.
    pub display: DisplayConfig,
}

impl ViewerConfig {
    /// Loads configuration from the embedded defaults, overlaid with `file`
    /// when one is given.
    pub fn load(file: Option<&Utf8Path>) -> Result<Self, ViewerConfigError> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));
        if let Some(path) = file {
            builder = builder.add_source(File::new(path.as_str(), FileFormat::Toml));
        }
        let config = builder.build().map_err(|source| match file {
            Some(path) => ViewerConfigError::Read { path: path.to_owned(), source },
            None => ViewerConfigError::Parse { source },
        })?;
        config
            .try_deserialize()
            .map_err(|source| ViewerConfigError::Parse { source })
    }
}

/// Connection settings for the report server.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ServerConfig {
    /// Base URL of the report server.
    pub base_url: String,
    /// How often the interactive view refreshes.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Initial display settings, before query parameters override them.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DisplayConfig {
    /// Which outcome class to show.
    pub filter: FilterMode,
    /// Show entries with nothing underneath them.
    pub display_empty: bool,
    /// Show entries whose effective status is skipped.
    pub display_skipped: bool,
    /// Render tags next to entry names.
    pub display_tags: bool,
    /// Render measured run times next to entry names.
    pub display_time: bool,
}

impl DisplayConfig {
    /// The view query these settings start a session with.
    pub fn view_query(&self) -> ViewQuery {
        ViewQuery {
            filter: self.filter,
            display: DisplayOptions {
                display_empty: self.display_empty,
                display_skipped: self.display_skipped,
                display_tags: self.display_tags,
                display_time: self.display_time,
            },
        }
    }
}
