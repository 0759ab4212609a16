// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP clients for the report server.
//!
//! [`ReportClient`] reads report documents: stored ones through the batch
//! API, the live one through the interactive API. [`ControlClient`] drives
//! interactive execution with `PUT` requests against the same API. The
//! server always answers control requests with HTTP 200; refusals come back
//! as a JSON object with an `errmsg` key.

use crate::{
    config::ServerConfig,
    errors::{ControlError, FetchError},
    nav::SelectionPath,
    route::SEGMENT,
};
use percent_encoding::utf8_percent_encode;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;
use testview_report::{EnvStatus, RuntimeStatus, TestReport};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

fn parse_base_url(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|source| FetchError::BaseUrl {
        url: raw.to_owned(),
        source,
    })
}

fn build_client(config: &ServerConfig) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|source| FetchError::Client { source })
}

fn api_url(base: &Url, segments: &[&str]) -> String {
    let mut url = base.as_str().trim_end_matches('/').to_owned();
    url.push_str("/api/v1");
    for segment in segments {
        let _ = write!(url, "/{}", utf8_percent_encode(segment, SEGMENT));
    }
    url
}

/// Read-only client for report documents.
#[derive(Clone, Debug)]
pub struct ReportClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ReportClient {
    /// Builds a client from server settings.
    pub fn new(config: &ServerConfig) -> Result<Self, FetchError> {
        Ok(ReportClient {
            client: build_client(config)?,
            base_url: parse_base_url(&config.base_url)?,
        })
    }

    /// Fetches a stored report by uid.
    pub async fn batch_report(&self, report_uid: &str) -> Result<TestReport, FetchError> {
        self.get_report(api_url(&self.base_url, &["reports", report_uid]))
            .await
    }

    /// Fetches the live interactive report.
    pub async fn interactive_report(&self) -> Result<TestReport, FetchError> {
        self.get_report(api_url(&self.base_url, &["interactive", "report"]))
            .await
    }

    async fn get_report(&self, url: String) -> Result<TestReport, FetchError> {
        debug!("fetching report from {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Http { url: url.clone(), source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }
        response
            .json()
            .await
            .map_err(|source| FetchError::Decode { url, source })
    }
}

/// An entry addressable through the interactive API.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ControlTarget {
    /// The whole report.
    Report {
        /// Uid of the report root.
        uid: String,
    },
    /// A test instance.
    Test {
        /// Uid of the test instance.
        test: String,
    },
    /// A suite within a test instance.
    Suite {
        /// Uid of the test instance.
        test: String,
        /// Uid of the suite.
        suite: String,
    },
    /// A testcase or parametrization group within a suite.
    Case {
        /// Uid of the test instance.
        test: String,
        /// Uid of the suite.
        suite: String,
        /// Uid of the testcase or parametrization group.
        case: String,
    },
    /// A member case of a parametrization group.
    Parametrization {
        /// Uid of the test instance.
        test: String,
        /// Uid of the suite.
        suite: String,
        /// Uid of the parametrization group.
        case: String,
        /// Uid of the member case.
        parametrization: String,
    },
}

impl ControlTarget {
    /// Builds a target from a selection path. The first segment addresses
    /// the report root. Returns `None` for empty selections and for paths
    /// deeper than the API addresses.
    pub fn from_path(path: &SelectionPath) -> Option<Self> {
        match path.segments() {
            [] => None,
            [root] => Some(ControlTarget::Report { uid: root.clone() }),
            [_, test] => Some(ControlTarget::Test { test: test.clone() }),
            [_, test, suite] => Some(ControlTarget::Suite {
                test: test.clone(),
                suite: suite.clone(),
            }),
            [_, test, suite, case] => Some(ControlTarget::Case {
                test: test.clone(),
                suite: suite.clone(),
                case: case.clone(),
            }),
            [_, test, suite, case, parametrization] => Some(ControlTarget::Parametrization {
                test: test.clone(),
                suite: suite.clone(),
                case: case.clone(),
                parametrization: parametrization.clone(),
            }),
            _ => None,
        }
    }

    /// The uid named in request bodies: the most specific one.
    pub fn uid(&self) -> &str {
        match self {
            ControlTarget::Report { uid } => uid,
            ControlTarget::Test { test } => test,
            ControlTarget::Suite { suite, .. } => suite,
            ControlTarget::Case { case, .. } => case,
            ControlTarget::Parametrization { parametrization, .. } => parametrization,
        }
    }

    fn segments(&self) -> Vec<&str> {
        match self {
            ControlTarget::Report { .. } => vec!["report"],
            ControlTarget::Test { test } => vec!["report", "tests", test],
            ControlTarget::Suite { test, suite } => {
                vec!["report", "tests", test, "suites", suite]
            }
            ControlTarget::Case { test, suite, case } => {
                vec!["report", "tests", test, "suites", suite, "testcases", case]
            }
            ControlTarget::Parametrization { test, suite, case, parametrization } => vec![
                "report",
                "tests",
                test,
                "suites",
                suite,
                "testcases",
                case,
                "parametrizations",
                parametrization,
            ],
        }
    }

    fn pending_key(&self) -> String {
        self.segments().join("/")
    }
}

#[derive(Serialize)]
struct RunRequest<'a> {
    uid: &'a str,
    runtime_status: RuntimeStatus,
}

#[derive(Serialize)]
struct EnvRequest<'a> {
    uid: &'a str,
    env_status: EnvStatus,
}

/// Client for driving interactive execution.
///
/// At most one request per target may be in flight; further requests for
/// the same target fail fast with [`ControlError::RequestPending`].
#[derive(Debug)]
pub struct ControlClient {
    client: reqwest::Client,
    base_url: Url,
    pending: Mutex<HashSet<String>>,
}

impl ControlClient {
    /// Builds a client from server settings.
    pub fn new(config: &ServerConfig) -> Result<Self, ControlError> {
        Ok(ControlClient {
            client: build_client(config)?,
            base_url: parse_base_url(&config.base_url)?,
            pending: Mutex::new(HashSet::new()),
        })
    }

    /// Asks the server to run the target.
    ///
    /// `current` is the target's runtime status as last seen. Runs are
    /// refused client-side while the target is resetting; the server
    /// re-checks under its own lock either way.
    pub async fn trigger_run(
        &self,
        target: &ControlTarget,
        current: Option<RuntimeStatus>,
    ) -> Result<(), ControlError> {
        if let Some(current) = current.filter(|current| current.blocks_run()) {
            return Err(ControlError::OutOfOrder {
                current,
                requested: RuntimeStatus::Running,
            });
        }
        let body = RunRequest {
            uid: target.uid(),
            runtime_status: RuntimeStatus::Running,
        };
        self.send(target, &body).await
    }

    /// Asks the server to reset the target's interactive state.
    ///
    /// Resets are refused client-side while the target is running or
    /// waiting.
    pub async fn trigger_reset(
        &self,
        target: &ControlTarget,
        current: Option<RuntimeStatus>,
    ) -> Result<(), ControlError> {
        if let Some(current) = current.filter(|current| current.blocks_reset()) {
            return Err(ControlError::OutOfOrder {
                current,
                requested: RuntimeStatus::Resetting,
            });
        }
        let body = RunRequest {
            uid: target.uid(),
            runtime_status: RuntimeStatus::Resetting,
        };
        self.send(target, &body).await
    }

    /// Toggles the target's environment and returns the state it moves
    /// into: stopped environments start, started ones stop.
    pub async fn toggle_environment(
        &self,
        target: &ControlTarget,
        current: EnvStatus,
    ) -> Result<EnvStatus, ControlError> {
        let next = current.toggle_target().ok_or(ControlError::EnvBusy {
            uid: target.uid().to_owned(),
            current,
        })?;
        let body = EnvRequest { uid: target.uid(), env_status: next };
        self.send(target, &body).await?;
        Ok(next)
    }

    async fn send<B: Serialize>(&self, target: &ControlTarget, body: &B) -> Result<(), ControlError> {
        let key = target.pending_key();
        {
            let mut pending = self.pending.lock().await;
            if !pending.insert(key.clone()) {
                return Err(ControlError::RequestPending {
                    uid: target.uid().to_owned(),
                });
            }
        }
        let result = self.send_inner(target, body).await;
        self.pending.lock().await.remove(&key);
        result
    }

    async fn send_inner<B: Serialize>(
        &self,
        target: &ControlTarget,
        body: &B,
    ) -> Result<(), ControlError> {
        let mut segments = vec!["interactive"];
        segments.extend(target.segments());
        let url = api_url(&self.base_url, &segments);
        debug!("control request to {url}");

        let response = self
            .client
            .put(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| FetchError::Http { url: url.clone(), source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status }.into());
        }
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|source| FetchError::Decode { url, source })?;
        if let Some(message) = value.get("errmsg").and_then(serde_json::Value::as_str) {
            return Err(ControlError::Rejected { message: message.to_owned() });
        }
        Ok(())
    }
}
