// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testview-core.

use camino::Utf8PathBuf;
use testview_report::{EnvStatus, RuntimeStatus};

/// An error that occurred while resolving a selection path against a report
/// tree.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum SelectionError {
    /// The first path segment did not match the report root.
    #[error("selection starts at `{segment}` but the report root is `{root}`")]
    UnknownRoot {
        /// Uid of the report root.
        root: String,
        /// The segment that was supposed to address it.
        segment: String,
    },

    /// A path segment did not match any child of the entry above it.
    #[error("no entry with uid `{segment}` under `{parent}`")]
    UnknownSegment {
        /// Uid of the entry whose children were searched.
        parent: String,
        /// The segment that failed to match.
        segment: String,
    },

    /// An operation needed the parent of the selection tail, but the tail
    /// is the only element of the chain.
    #[error("entry `{uid}` has no parent within the selection")]
    MissingParent {
        /// Uid of the orphaned tail.
        uid: String,
    },
}

/// An error that occurred while fetching or refreshing a report document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The configured base URL could not be parsed.
    #[error("invalid server base URL `{url}`")]
    BaseUrl {
        /// The offending URL string.
        url: String,
        /// The underlying parse error.
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build the HTTP client")]
    Client {
        /// The underlying client error.
        source: reqwest::Error,
    },

    /// The request could not be sent, or the connection failed mid-flight.
    #[error("request to `{url}` failed")]
    Http {
        /// The request URL.
        url: String,
        /// The underlying transport error.
        source: reqwest::Error,
    },

    /// The server answered with a non-success status code.
    #[error("`{url}` returned HTTP {status}")]
    Status {
        /// The request URL.
        url: String,
        /// The response status code.
        status: reqwest::StatusCode,
    },

    /// The response body was not a valid report document.
    #[error("failed to decode the response from `{url}`")]
    Decode {
        /// The request URL.
        url: String,
        /// The underlying decode error.
        source: reqwest::Error,
    },

    /// The load was cancelled before it completed.
    #[error("report load cancelled")]
    Cancelled,

    /// A newer load finished first; this result was discarded.
    #[error("report load superseded by a newer one")]
    Superseded,
}

/// An error that occurred while driving interactive execution.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ControlError {
    /// The requested state change is not legal from the current state.
    #[error("cannot move a {current} entry to {requested}")]
    OutOfOrder {
        /// The entry's current runtime status.
        current: RuntimeStatus,
        /// The runtime status the request would have set.
        requested: RuntimeStatus,
    },

    /// The environment is mid-transition and cannot be toggled yet.
    #[error("environment of `{uid}` is {current}; wait for the transition to finish")]
    EnvBusy {
        /// Uid of the entry owning the environment.
        uid: String,
        /// The transitional state it is in.
        current: EnvStatus,
    },

    /// A control request for the same target is still in flight.
    #[error("a request for `{uid}` is already pending")]
    RequestPending {
        /// Uid of the busy target.
        uid: String,
    },

    /// The server acknowledged the request but refused to apply it.
    #[error("server rejected the request: {message}")]
    Rejected {
        /// The server's error message.
        message: String,
    },

    /// The request failed at the transport level.
    #[error(transparent)]
    Transport(#[from] FetchError),
}

/// An error that occurred while parsing a viewer route.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum RouteError {
    /// The path does not start with a recognized route prefix.
    #[error("unrecognized route `{path}`")]
    UnknownPrefix {
        /// The path that failed to parse.
        path: String,
    },

    /// A percent-encoded segment did not decode to valid UTF-8.
    #[error("invalid percent-encoded segment `{segment}`")]
    InvalidPercentEncoding {
        /// The offending segment.
        segment: String,
    },

    /// A segment was not valid base64.
    #[error("invalid base64 segment `{segment}`")]
    InvalidBase64 {
        /// The offending segment.
        segment: String,
        /// The underlying decode error.
        source: base64::DecodeError,
    },

    /// A base64 segment decoded to bytes that are not UTF-8.
    #[error("base64 segment `{segment}` is not UTF-8")]
    InvalidBase64Utf8 {
        /// The offending segment.
        segment: String,
        /// The underlying conversion error.
        source: std::string::FromUtf8Error,
    },

    /// The `filter` query parameter holds an unknown value.
    #[error("unknown filter `{value}` (expected one of: all, pass, fail)")]
    UnknownFilter {
        /// The value that failed to parse.
        value: String,
    },

    /// A boolean display flag holds a value other than `true` or `false`.
    #[error("invalid value `{value}` for query flag `{key}`")]
    InvalidFlag {
        /// The query key.
        key: String,
        /// The value that failed to parse.
        value: String,
    },
}

/// An error that occurred while loading viewer configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ViewerConfigError {
    /// The config file could not be read or layered.
    #[error("failed to read config file `{path}`")]
    Read {
        /// Path to the file that failed.
        path: Utf8PathBuf,
        /// The underlying error.
        source: config::ConfigError,
    },

    /// The layered configuration did not match the expected shape.
    #[error("invalid viewer config")]
    Parse {
        /// The underlying error.
        source: config::ConfigError,
    },
}
