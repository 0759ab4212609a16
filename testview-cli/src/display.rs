// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering for report trees.
//!
//! One line per displayed entry, status word right-aligned in a fixed
//! column the way test runners print their progress, so mixed levels stay
//! scannable:
//!
//! ```text
//!       FAILED [   2.531s] Primary suite (11/14 passed)
//!       PASSED Beta suite (3/3 passed)
//! ```

use itertools::Itertools;
use owo_colors::{OwoColorize, Style};
use std::io::{self, Write};
use testview_core::{filter::DisplayOptions, interactive::Action};
use testview_report::{ReportEntry, Status, StatusCategory, TestReport};

#[derive(Clone, Debug, Default)]
pub(crate) struct Styles {
    pub(crate) count: Style,
    pub(crate) crumb: Style,
    pub(crate) pass: Style,
    pub(crate) fail: Style,
    pub(crate) unstable: Style,
    pub(crate) unknown: Style,
    pub(crate) tag: Style,
    pub(crate) runtime: Style,
    pub(crate) play: Style,
    pub(crate) prohibit: Style,
}

impl Styles {
    pub(crate) fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.crumb = Style::new().bold().underline();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.unstable = Style::new().yellow().bold();
        self.unknown = Style::new().magenta().bold();
        self.tag = Style::new().yellow();
        self.runtime = Style::new().dimmed();
        self.play = Style::new().green().bold();
        self.prohibit = Style::new().dimmed();
    }

    fn for_category(&self, category: Option<StatusCategory>) -> Style {
        match category {
            Some(StatusCategory::Passed) => self.pass,
            Some(StatusCategory::Failed) => self.fail,
            Some(StatusCategory::Unstable) => self.unstable,
            Some(StatusCategory::Unknown) | None => self.unknown,
        }
    }
}

/// Everything row rendering needs besides the entry itself.
#[derive(Clone, Debug)]
pub(crate) struct RenderOptions<'a> {
    pub(crate) styles: &'a Styles,
    pub(crate) display: DisplayOptions,
    pub(crate) verbose: bool,
}

fn status_word(status: Option<Status>) -> String {
    match status {
        Some(status) => status.as_str().to_uppercase(),
        None => "-".to_owned(),
    }
}

/// Writes the one-line report header: overall status, plan name and the
/// top-level pass counter.
pub(crate) fn write_summary(
    writer: &mut impl Write,
    report: &TestReport,
    opts: &RenderOptions<'_>,
) -> io::Result<()> {
    let style = opts.styles.for_category(report.root.status_category());
    write!(writer, "{:>12} ", status_word(report.status()).style(style))?;
    write!(writer, "{}", report.name())?;
    if let Some(label) = &report.label {
        write!(writer, " ({label})")?;
    }
    let counter = report.counter();
    writeln!(
        writer,
        ": {} of {} passed",
        counter.passed.style(opts.styles.count),
        counter.total.style(opts.styles.count),
    )?;
    Ok(())
}

/// Writes the breadcrumb trail for the current selection.
pub(crate) fn write_breadcrumbs(
    writer: &mut impl Write,
    crumbs: &[&ReportEntry],
    styles: &Styles,
) -> io::Result<()> {
    if crumbs.is_empty() {
        return Ok(());
    }
    write!(writer, "{:>12} ", "at")?;
    for (index, crumb) in crumbs.iter().enumerate() {
        if index > 0 {
            write!(writer, " > ")?;
        }
        write!(writer, "{}", crumb.name().style(styles.crumb))?;
    }
    writeln!(writer)
}

/// Writes one displayed entry.
pub(crate) fn write_row(
    writer: &mut impl Write,
    entry: &ReportEntry,
    opts: &RenderOptions<'_>,
) -> io::Result<()> {
    write_row_prefix(writer, entry, opts)?;
    write_row_body(writer, entry, opts)?;
    writeln!(writer)
}

/// Writes one displayed entry of the live report, with its runtime state
/// and, when the level is gated, its run action.
pub(crate) fn write_interactive_row(
    writer: &mut impl Write,
    entry: &ReportEntry,
    action: Option<Action>,
    opts: &RenderOptions<'_>,
) -> io::Result<()> {
    write_row_prefix(writer, entry, opts)?;
    let runtime = match entry.runtime_status() {
        Some(runtime) => runtime.as_str(),
        None => "-",
    };
    write!(writer, "{:>9} ", runtime.style(opts.styles.runtime))?;
    write_row_body(writer, entry, opts)?;
    match action {
        Some(Action::Play) => write!(writer, " [{}]", "play".style(opts.styles.play))?,
        Some(Action::Prohibit) => {
            write!(writer, " [{}]", "prohibited".style(opts.styles.prohibit))?;
        }
        None => {}
    }
    writeln!(writer)
}

fn write_row_prefix(
    writer: &mut impl Write,
    entry: &ReportEntry,
    opts: &RenderOptions<'_>,
) -> io::Result<()> {
    let style = opts.styles.for_category(entry.status_category());
    write!(writer, "{:>12} ", status_word(entry.status()).style(style))?;
    if opts.display.display_time {
        match entry.run_time() {
            Some(seconds) => write!(writer, "[{seconds:>8.3?}s] ")?,
            None => write!(writer, "[        -] ")?,
        }
    }
    Ok(())
}

fn write_row_body(
    writer: &mut impl Write,
    entry: &ReportEntry,
    opts: &RenderOptions<'_>,
) -> io::Result<()> {
    write!(writer, "{}", entry.name())?;
    if opts.verbose && entry.uid() != entry.name() {
        write!(writer, " ({})", entry.uid())?;
    }
    if !entry.is_leaf() {
        let counter = entry.counter();
        write!(
            writer,
            " ({}/{} passed)",
            counter.passed.style(opts.styles.count),
            counter.total.style(opts.styles.count),
        )?;
    }
    if opts.display.display_tags && !entry.tags().is_empty() {
        let tags = entry
            .tags()
            .iter()
            .flat_map(|(category, values)| {
                values.iter().map(move |value| match category.as_str() {
                    "simple" => value.clone(),
                    _ => format!("{category}:{value}"),
                })
            })
            .join(", ");
        write!(writer, " [{}]", tags.style(opts.styles.tag))?;
    }
    Ok(())
}
