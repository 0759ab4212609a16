// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Viewer route encoding and decoding.
//!
//! Two route families address report views. Batch routes show a stored
//! report: `/testplan/{uid}/{segment}/...` with percent-encoded selection
//! segments. Interactive routes show the live report:
//! `/interactive/{segment}/...` with base64url-encoded segments, padding
//! stripped. In both families the segments map one-to-one onto a
//! [`SelectionPath`], starting at the report root.
//!
//! Display state rides in the query string: `filter`, `displayEmpty`,
//! `displaySkipped`, `displayTags` and `displayTime`, with defaults left
//! out when formatting.

use crate::{
    errors::RouteError,
    filter::{DisplayOptions, FilterMode},
    nav::SelectionPath,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::fmt::Write as _;

/// Characters escaped in path segments: everything but RFC 3986 unreserved.
pub(crate) const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const BATCH_PREFIX: &str = "testplan";
const INTERACTIVE_PREFIX: &str = "interactive";

/// A parsed viewer route.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Route {
    /// A stored report, addressed by the first selection segment.
    Batch {
        /// The selection within the report, root uid first.
        selection: SelectionPath,
    },
    /// The live interactive report.
    Interactive {
        /// The selection within the report, root uid first.
        selection: SelectionPath,
    },
}

impl Route {
    /// The selection the route addresses.
    pub fn selection(&self) -> &SelectionPath {
        match self {
            Route::Batch { selection } | Route::Interactive { selection } => selection,
        }
    }

    /// For batch routes, the uid of the stored report to fetch.
    pub fn report_uid(&self) -> Option<&str> {
        match self {
            Route::Batch { selection } => selection.segments().first().map(String::as_str),
            Route::Interactive { .. } => None,
        }
    }

    /// True for interactive routes.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Route::Interactive { .. })
    }
}

/// Display state carried in the query string.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ViewQuery {
    /// Which outcome class to show.
    pub filter: FilterMode,
    /// Display toggles.
    pub display: DisplayOptions,
}

/// Parses a path with an optional query string into a route and view query.
pub fn parse(input: &str) -> Result<(Route, ViewQuery), RouteError> {
    let (path, query) = input.split_once('?').unwrap_or((input, ""));
    Ok((parse_route(path)?, parse_query(query)?))
}

/// Formats a route and view query back into a path, omitting default query
/// parameters.
pub fn format(route: &Route, query: &ViewQuery) -> String {
    let mut formatted = format_route(route);
    let query = format_query(query);
    if !query.is_empty() {
        formatted.push('?');
        formatted.push_str(&query);
    }
    formatted
}

/// Formats the path portion of a route.
pub fn format_route(route: &Route) -> String {
    match route {
        Route::Batch { selection } => {
            let mut path = format!("/{BATCH_PREFIX}");
            for segment in selection.segments() {
                let _ = write!(path, "/{}", utf8_percent_encode(segment, SEGMENT));
            }
            path
        }
        Route::Interactive { selection } => {
            let mut path = format!("/{INTERACTIVE_PREFIX}");
            for segment in selection.segments() {
                let _ = write!(path, "/{}", URL_SAFE_NO_PAD.encode(segment));
            }
            path
        }
    }
}

/// Parses the path portion of a route.
///
/// Trailing slashes and empty segments are ignored.
pub fn parse_route(path: &str) -> Result<Route, RouteError> {
    let unknown = || RouteError::UnknownPrefix { path: path.to_owned() };

    let mut parts = path
        .strip_prefix('/')
        .ok_or_else(unknown)?
        .split('/')
        .filter(|part| !part.is_empty());
    let prefix = parts.next().ok_or_else(unknown)?;

    match prefix {
        BATCH_PREFIX => {
            let selection = parts.map(decode_batch_segment).collect::<Result<_, _>>()?;
            Ok(Route::Batch { selection })
        }
        INTERACTIVE_PREFIX => {
            let selection = parts
                .map(decode_interactive_segment)
                .collect::<Result<_, _>>()?;
            Ok(Route::Interactive { selection })
        }
        _ => Err(unknown()),
    }
}

fn decode_batch_segment(segment: &str) -> Result<String, RouteError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| RouteError::InvalidPercentEncoding {
            segment: segment.to_owned(),
        })
}

fn decode_interactive_segment(segment: &str) -> Result<String, RouteError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|source| RouteError::InvalidBase64 {
            segment: segment.to_owned(),
            source,
        })?;
    String::from_utf8(bytes).map_err(|source| RouteError::InvalidBase64Utf8 {
        segment: segment.to_owned(),
        source,
    })
}

/// Parses a query string into a view query. Unknown keys are ignored so
/// newer servers can add parameters without breaking older viewers.
pub fn parse_query(query: &str) -> Result<ViewQuery, RouteError> {
    let mut view = ViewQuery::default();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "filter" => {
                view.filter = match value {
                    "all" => FilterMode::All,
                    "pass" => FilterMode::Pass,
                    "fail" => FilterMode::Fail,
                    other => {
                        return Err(RouteError::UnknownFilter { value: other.to_owned() });
                    }
                };
            }
            "displayEmpty" => view.display.display_empty = parse_flag(key, value)?,
            "displaySkipped" => view.display.display_skipped = parse_flag(key, value)?,
            "displayTags" => view.display.display_tags = parse_flag(key, value)?,
            "displayTime" => view.display.display_time = parse_flag(key, value)?,
            _ => {}
        }
    }
    Ok(view)
}

/// Formats the non-default parts of a view query.
pub fn format_query(query: &ViewQuery) -> String {
    let defaults = ViewQuery::default();
    let mut pairs = Vec::new();
    if query.filter != defaults.filter {
        pairs.push(format!("filter={}", query.filter));
    }
    let flags = [
        ("displayEmpty", query.display.display_empty, defaults.display.display_empty),
        ("displaySkipped", query.display.display_skipped, defaults.display.display_skipped),
        ("displayTags", query.display.display_tags, defaults.display.display_tags),
        ("displayTime", query.display.display_time, defaults.display.display_time),
    ];
    for (key, value, default) in flags {
        if value != default {
            pairs.push(format!("{key}={value}"));
        }
    }
    pairs.join("&")
}

fn parse_flag(key: &str, value: &str) -> Result<bool, RouteError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(RouteError::InvalidFlag {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn path(segments: &[&str]) -> SelectionPath {
        segments.iter().copied().collect()
    }

    #[test]
    fn batch_routes_percent_encode_segments() {
        let route = Route::Batch {
            selection: path(&["My Plan", "suite/one"]),
        };
        let formatted = format_route(&route);
        assert_eq!(formatted, "/testplan/My%20Plan/suite%2Fone");
        assert_eq!(parse_route(&formatted).expect("parses"), route);
    }

    #[test]
    fn interactive_routes_base64_encode_segments() {
        let route = Route::Interactive {
            selection: path(&["plan", "mt"]),
        };
        let formatted = format_route(&route);
        assert_eq!(formatted, "/interactive/cGxhbg/bXQ");
        assert_eq!(parse_route(&formatted).expect("parses"), route);
    }

    #[test]
    fn bare_prefixes_parse_to_empty_selections() {
        let route = parse_route("/testplan").expect("parses");
        assert_eq!(route, Route::Batch { selection: SelectionPath::new() });
        assert_eq!(route.report_uid(), None);

        let route = parse_route("/interactive/").expect("parses");
        assert_eq!(route, Route::Interactive { selection: SelectionPath::new() });
        assert!(route.is_interactive());
    }

    #[test]
    fn trailing_slashes_and_doubled_slashes_are_tolerated() {
        let parsed = parse_route("/testplan//nightly/").expect("parses");
        assert_eq!(parsed, Route::Batch { selection: path(&["nightly"]) });
        assert_eq!(parsed.report_uid(), Some("nightly"));
    }

    #[test]
    fn unknown_prefixes_fail() {
        for input in ["/styleguide", "testplan/x", "", "/"] {
            let err = parse_route(input).expect_err("must fail");
            assert_eq!(err, RouteError::UnknownPrefix { path: input.to_owned() });
        }
    }

    #[test]
    fn invalid_segments_fail_loudly() {
        let err = parse_route("/testplan/%FF").expect_err("invalid utf-8 fails");
        assert_eq!(
            err,
            RouteError::InvalidPercentEncoding { segment: "%FF".to_owned() }
        );

        let err = parse_route("/interactive/!!!").expect_err("invalid base64 fails");
        assert!(matches!(err, RouteError::InvalidBase64 { segment, .. } if segment == "!!!"));
    }

    #[test]
    fn queries_parse_with_defaults_and_overrides() {
        let (route, query) = parse("/testplan/nightly").expect("parses");
        assert_eq!(route.report_uid(), Some("nightly"));
        assert_eq!(query, ViewQuery::default());

        let (_, query) =
            parse("/testplan/nightly?filter=fail&displayEmpty=false&displayTime=true&later=x")
                .expect("parses");
        assert_eq!(query.filter, FilterMode::Fail);
        assert!(!query.display.display_empty);
        assert!(query.display.display_skipped);
        assert!(query.display.display_time);
    }

    #[test]
    fn bad_query_values_fail_loudly() {
        let err = parse_query("filter=bogus").expect_err("unknown filter fails");
        assert_eq!(err, RouteError::UnknownFilter { value: "bogus".to_owned() });

        let err = parse_query("displayTags=yes").expect_err("non-boolean flag fails");
        assert_eq!(
            err,
            RouteError::InvalidFlag { key: "displayTags".to_owned(), value: "yes".to_owned() }
        );
    }

    #[test]
    fn formatting_omits_defaults() {
        let query = ViewQuery::default();
        assert_eq!(format_query(&query), "");

        let query = ViewQuery {
            filter: FilterMode::Fail,
            display: DisplayOptions { display_skipped: false, ..DisplayOptions::default() },
        };
        let route = Route::Batch { selection: path(&["nightly"]) };
        assert_eq!(format(&route, &query), "/testplan/nightly?filter=fail&displaySkipped=false");
    }

    #[proptest(cases = 64)]
    fn routes_round_trip(
        #[strategy(prop::collection::vec(
            any::<String>().prop_filter("segments are non-empty", |s| !s.is_empty()),
            0..4,
        ))]
        segments: Vec<String>,
        interactive: bool,
    ) {
        let selection: SelectionPath = segments.into_iter().collect();
        let route = if interactive {
            Route::Interactive { selection }
        } else {
            Route::Batch { selection }
        };
        let parsed = parse_route(&format_route(&route)).expect("round trip parses");
        prop_assert_eq!(parsed, route);
    }
}
