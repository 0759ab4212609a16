// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level application and command routing.

use crate::{
    display::{self, RenderOptions, Styles},
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use std::{io::Write, sync::Arc, time::Duration};
use testview_core::{
    client::{ControlClient, ControlTarget, ReportClient},
    config::{ServerConfig, ViewerConfig},
    errors::FetchError,
    filter::{self, FilterMode},
    interactive::{self, Action},
    nav::{Selection, SelectionPath},
    route::ViewQuery,
    store::{CancelToken, ReportStore},
};
use testview_report::{EnvStatus, ReportEntry, TestReport};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// A terminal viewer for hierarchical test reports.
///
/// Renders stored report documents from a file or the report server, and
/// follows and drives the live report of an interactive session.
#[derive(Debug, Parser)]
#[command(
    name = "testview",
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct TestviewApp {
    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(flatten)]
    output: OutputOpts,

    #[clap(subcommand)]
    command: Command,
}

impl TestviewApp {
    /// Executes the app.
    pub fn exec(self, output_writer: &mut OutputWriter) -> Result<()> {
        let output = self.output.init();
        let config = self.config_opts.load()?;

        match self.command {
            Command::View(opts) => opts.exec(&config, output, output_writer),
            Command::Fetch(opts) => opts.exec(&config, output, output_writer),
            Command::Watch(opts) => opts.exec(&config, output, output_writer),
            Command::Run(opts) => opts.exec(&config),
            Command::Reset(opts) => opts.exec(&config),
            Command::Env(opts) => opts.exec(&config),
        }
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Config file [default: ./testview.toml if present]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn load(&self) -> Result<ViewerConfig> {
        let path = match &self.config_file {
            Some(path) => Some(path.clone()),
            None => {
                let discovered = Utf8PathBuf::from("testview.toml");
                discovered.exists().then_some(discovered)
            }
        };
        ViewerConfig::load(path.as_deref()).wrap_err_with(|| match &path {
            Some(path) => format!("failed to load config from `{path}`"),
            None => "failed to load the built-in default config".to_owned(),
        })
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a report from a JSON file
    View(ViewOpts),
    /// Fetch a stored report from the server and render it
    Fetch(FetchOpts),
    /// Follow the live interactive report until interrupted
    Watch(WatchOpts),
    /// Trigger a run of an entry in the live report
    Run(RunOpts),
    /// Reset the interactive state of an entry in the live report
    Reset(ResetOpts),
    /// Start or stop the environment of an entry in the live report
    Env(EnvOpts),
}

/// The CLI face of [`FilterMode`]. Kept separate so the core crate stays
/// free of clap.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum FilterArg {
    /// Show every entry
    All,
    /// Show entries with passing testcases underneath them
    Pass,
    /// Show entries that failed, or contain failures
    Fail,
}

impl FilterArg {
    fn to_mode(self) -> FilterMode {
        match self {
            FilterArg::All => FilterMode::All,
            FilterArg::Pass => FilterMode::Pass,
            FilterArg::Fail => FilterMode::Fail,
        }
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Display options")]
struct DisplayOpts {
    /// Selection below the report root, as slash-separated uids
    #[arg(long, value_name = "PATH")]
    select: Option<String>,

    /// Which outcome class to show [default: from config]
    #[arg(long, value_enum, value_name = "MODE")]
    filter: Option<FilterArg>,

    /// Show entries with nothing underneath them [default: from config]
    #[arg(long, value_name = "BOOL")]
    show_empty: Option<bool>,

    /// Show skipped entries [default: from config]
    #[arg(long, value_name = "BOOL")]
    show_skipped: Option<bool>,

    /// Show tags next to entry names [default: from config]
    #[arg(long, value_name = "BOOL")]
    show_tags: Option<bool>,

    /// Show run times next to entry names [default: from config]
    #[arg(long, value_name = "BOOL")]
    show_time: Option<bool>,
}

impl DisplayOpts {
    /// The view query for this invocation: configured defaults, overridden
    /// flag by flag.
    fn view_query(&self, config: &ViewerConfig) -> ViewQuery {
        let mut query = config.display.view_query();
        if let Some(filter) = self.filter {
            query.filter = filter.to_mode();
        }
        if let Some(value) = self.show_empty {
            query.display.display_empty = value;
        }
        if let Some(value) = self.show_skipped {
            query.display.display_skipped = value;
        }
        if let Some(value) = self.show_tags {
            query.display.display_tags = value;
        }
        if let Some(value) = self.show_time {
            query.display.display_time = value;
        }
        query
    }

    fn selection_path(&self, root_uid: &str) -> SelectionPath {
        match &self.select {
            Some(select) => target_path(root_uid, select),
            None => [root_uid].into_iter().collect(),
        }
    }
}

#[derive(Debug, Args)]
struct ViewOpts {
    /// Report JSON file to render
    #[arg(value_name = "REPORT")]
    report: Utf8PathBuf,

    #[clap(flatten)]
    display: DisplayOpts,
}

impl ViewOpts {
    fn exec(
        self,
        config: &ViewerConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<()> {
        let data = std::fs::read_to_string(&self.report)
            .wrap_err_with(|| format!("failed to read report from `{}`", self.report))?;
        let report: TestReport = serde_json::from_str(&data)
            .wrap_err_with(|| format!("`{}` is not a report document", self.report))?;
        render_batch(&report, &self.display, config, output, output_writer)
    }
}

#[derive(Debug, Args)]
struct FetchOpts {
    /// Uid of the stored report to fetch
    #[arg(value_name = "REPORT_UID")]
    report_uid: String,

    /// Base URL of the report server [default: from config]
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    #[clap(flatten)]
    display: DisplayOpts,
}

impl FetchOpts {
    fn exec(
        self,
        config: &ViewerConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<()> {
        let server = resolve_server(config, self.base_url.as_deref());
        let client = ReportClient::new(&server)?;
        let runtime = build_runtime()?;
        let report = runtime
            .block_on(client.batch_report(&self.report_uid))
            .wrap_err_with(|| format!("failed to fetch report `{}`", self.report_uid))?;
        render_batch(&report, &self.display, config, output, output_writer)
    }
}

#[derive(Debug, Args)]
struct WatchOpts {
    /// Base URL of the report server [default: from config]
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// How often to refresh [default: from config]
    #[arg(long, value_name = "DURATION", value_parser = non_zero_duration)]
    poll_interval: Option<Duration>,

    #[clap(flatten)]
    display: DisplayOpts,
}

impl WatchOpts {
    fn exec(
        self,
        config: &ViewerConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<()> {
        let server = resolve_server(config, self.base_url.as_deref());
        let every = self.poll_interval.unwrap_or(server.poll_interval);
        let runtime = build_runtime()?;
        runtime.block_on(self.watch(&server, every, config, output, output_writer))
    }

    async fn watch(
        &self,
        server: &ServerConfig,
        every: Duration,
        config: &ViewerConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<()> {
        let client = ReportClient::new(server)?;
        let store = ReportStore::new();
        let cancel = CancelToken::new();

        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                watcher.cancel();
            }
        });

        let query = self.display.view_query(config);
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Arc<TestReport>> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match store.load_with(&cancel, || client.interactive_report()).await {
                Ok(report) => {
                    // Re-render only on change; unchanged polls stay quiet.
                    if last.as_deref() != Some(report.as_ref()) {
                        render_interactive(
                            report.as_ref(),
                            &self.display,
                            query,
                            output,
                            output_writer,
                        )?;
                        last = Some(report);
                    }
                }
                Err(FetchError::Cancelled) => break,
                Err(FetchError::Superseded) => {}
                Err(error) => warn!("live report refresh failed: {error}"),
            }
        }
        info!("stopped watching");
        Ok(())
    }
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Entry to run, as slash-separated uids below the report root
    #[arg(value_name = "TARGET")]
    target: String,

    /// Base URL of the report server [default: from config]
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
}

impl RunOpts {
    fn exec(self, config: &ViewerConfig) -> Result<()> {
        let server = resolve_server(config, self.base_url.as_deref());
        let runtime = build_runtime()?;
        runtime.block_on(self.run(&server))
    }

    async fn run(&self, server: &ServerConfig) -> Result<()> {
        let client = ReportClient::new(server)?;
        let control = ControlClient::new(server)?;
        let report = client.interactive_report().await?;

        let path = target_path(report.uid(), &self.target);
        let selection = Selection::resolve(&report, &path)
            .wrap_err_with(|| format!("`{}` does not resolve in the live report", self.target))?;
        let tail = selection.tail().ok_or_else(|| eyre!("nothing selected"))?;

        // Strict-order gating is checked here first; the server re-checks
        // under its own lock.
        let actions = interactive::compute_actions(&selection)?;
        let gate = match selection.parent_of_tail() {
            Some(parent) if matches!(parent, ReportEntry::Parametrization(_)) => {
                actions.member(parent.uid(), tail.uid())
            }
            _ => actions.direct(tail.uid()),
        };
        if gate == Some(Action::Prohibit) {
            bail!(
                "`{}` is not runnable right now: its suite enforces strict order",
                self.target
            );
        }

        let target = control_target(&path, &self.target)?;
        control.trigger_run(&target, tail.runtime_status()).await?;
        info!("run of `{}` requested", self.target);
        Ok(())
    }
}

#[derive(Debug, Args)]
struct ResetOpts {
    /// Entry to reset, as slash-separated uids below the report root
    #[arg(value_name = "TARGET")]
    target: String,

    /// Base URL of the report server [default: from config]
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
}

impl ResetOpts {
    fn exec(self, config: &ViewerConfig) -> Result<()> {
        let server = resolve_server(config, self.base_url.as_deref());
        let runtime = build_runtime()?;
        runtime.block_on(self.reset(&server))
    }

    async fn reset(&self, server: &ServerConfig) -> Result<()> {
        let client = ReportClient::new(server)?;
        let control = ControlClient::new(server)?;
        let report = client.interactive_report().await?;

        let path = target_path(report.uid(), &self.target);
        let selection = Selection::resolve(&report, &path)
            .wrap_err_with(|| format!("`{}` does not resolve in the live report", self.target))?;
        let tail = selection.tail().ok_or_else(|| eyre!("nothing selected"))?;

        let target = control_target(&path, &self.target)?;
        control.trigger_reset(&target, tail.runtime_status()).await?;
        info!("reset of `{}` requested", self.target);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum EnvDirection {
    /// Start the environment
    Start,
    /// Stop the environment
    Stop,
}

#[derive(Debug, Args)]
struct EnvOpts {
    /// Whether to start or stop the environment
    #[arg(value_enum, value_name = "DIRECTION")]
    direction: EnvDirection,

    /// Entry whose environment to control, as slash-separated uids
    #[arg(value_name = "TARGET")]
    target: String,

    /// Base URL of the report server [default: from config]
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
}

impl EnvOpts {
    fn exec(self, config: &ViewerConfig) -> Result<()> {
        let server = resolve_server(config, self.base_url.as_deref());
        let runtime = build_runtime()?;
        runtime.block_on(self.toggle(&server))
    }

    async fn toggle(&self, server: &ServerConfig) -> Result<()> {
        let client = ReportClient::new(server)?;
        let control = ControlClient::new(server)?;
        let report = client.interactive_report().await?;

        let path = target_path(report.uid(), &self.target);
        let selection = Selection::resolve(&report, &path)
            .wrap_err_with(|| format!("`{}` does not resolve in the live report", self.target))?;
        let tail = selection.tail().ok_or_else(|| eyre!("nothing selected"))?;
        let current = tail
            .as_group()
            .and_then(|group| group.env_status)
            .ok_or_else(|| eyre!("`{}` does not track an environment", self.target))?;

        match (self.direction, current) {
            (EnvDirection::Start, EnvStatus::Stopped)
            | (EnvDirection::Stop, EnvStatus::Started) => {}
            (EnvDirection::Start, EnvStatus::Started)
            | (EnvDirection::Stop, EnvStatus::Stopped) => {
                bail!("environment of `{}` is already {current}", self.target);
            }
            _ => {
                bail!(
                    "environment of `{}` is {current}; wait for the transition to finish",
                    self.target
                );
            }
        }

        let target = control_target(&path, &self.target)?;
        let next = control.toggle_environment(&target, current).await?;
        info!("environment of `{}` moving to {next}", self.target);
        Ok(())
    }
}

/// Prepends the report root to a slash-separated target. Empty segments
/// are dropped.
fn target_path(root_uid: &str, target: &str) -> SelectionPath {
    let mut path = SelectionPath::new();
    path.push(root_uid);
    for segment in target.split('/').filter(|segment| !segment.is_empty()) {
        path.push(segment);
    }
    path
}

fn control_target(path: &SelectionPath, target: &str) -> Result<ControlTarget> {
    ControlTarget::from_path(path)
        .ok_or_else(|| eyre!("`{target}` is deeper than the interactive API addresses"))
}

fn resolve_server(config: &ViewerConfig, base_url: Option<&str>) -> ServerConfig {
    let mut server = config.server.clone();
    if let Some(base_url) = base_url {
        server.base_url = base_url.to_owned();
    }
    server
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start the async runtime")
}

fn non_zero_duration(input: &str) -> std::result::Result<Duration, String> {
    let duration = humantime::parse_duration(input).map_err(|error| error.to_string())?;
    if duration.is_zero() {
        Err("duration must be non-zero".to_string())
    } else {
        Ok(duration)
    }
}

fn stdout_styles(output: OutputContext) -> Styles {
    let mut styles = Styles::default();
    if output.color.should_colorize(supports_color::Stream::Stdout) {
        styles.colorize();
    }
    styles
}

fn render_batch(
    report: &TestReport,
    display: &DisplayOpts,
    config: &ViewerConfig,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<()> {
    let query = display.view_query(config);
    let path = display.selection_path(report.uid());
    let selection = Selection::resolve(report, &path)
        .wrap_err_with(|| format!("selection `{path}` does not resolve"))?;

    let styles = stdout_styles(output);
    let opts = RenderOptions {
        styles: &styles,
        display: query.display,
        verbose: output.verbose,
    };

    let mut out = output_writer.stdout_writer();
    display::write_summary(&mut out, report, &opts)?;
    display::write_breadcrumbs(&mut out, selection.breadcrumbs(), &styles)?;
    for entry in filter::apply_filter(selection.display_entries()?, query.filter, &query.display) {
        display::write_row(&mut out, entry, &opts)?;
    }
    out.flush()?;
    Ok(())
}

fn render_interactive(
    report: &TestReport,
    display: &DisplayOpts,
    query: ViewQuery,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<()> {
    let path = display.selection_path(report.uid());
    let selection = Selection::resolve(report, &path)
        .wrap_err_with(|| format!("selection `{path}` does not resolve"))?;
    let actions = interactive::compute_actions(&selection)?;
    let rows = interactive::interactive_rows(&selection, &actions)?;

    let styles = stdout_styles(output);
    let opts = RenderOptions {
        styles: &styles,
        display: query.display,
        verbose: output.verbose,
    };

    let mut out = output_writer.stdout_writer();
    display::write_summary(&mut out, report, &opts)?;
    display::write_breadcrumbs(&mut out, selection.breadcrumbs(), &styles)?;
    for (entry, action) in rows {
        if !filter::matches(entry, query.filter, &query.display) {
            continue;
        }
        display::write_interactive_row(&mut out, entry, action, &opts)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::NamedUtf8TempFile;
    use pretty_assertions::assert_eq;
    use testview_report::{CaseReport, GroupReport, Status};

    #[test]
    fn test_argument_parsing() {
        use clap::error::ErrorKind::{self, *};

        let valid: &[&'static str] = &[
            // ---
            // Basic commands
            // ---
            "testview view report.json",
            "testview fetch nightly",
            "testview watch",
            "testview run alpha",
            "testview reset alpha",
            "testview env start alpha",
            "testview env stop alpha",
            // ---
            // Display options
            // ---
            "testview view report.json --select alpha/suite-1",
            "testview view report.json --filter fail",
            "testview view report.json --filter all --show-time true",
            "testview fetch nightly --filter pass --show-empty false --show-skipped false",
            "testview watch --select alpha --filter fail --show-tags true",
            // ---
            // Server options
            // ---
            "testview fetch nightly --base-url http://localhost:8000",
            "testview run alpha/suite-1/case-1/param-2 --base-url http://localhost:8000",
            "testview reset alpha/suite-1",
            "testview env stop alpha --base-url http://localhost:8000",
            "testview watch --poll-interval 500ms",
            "testview watch --poll-interval 2s --select alpha",
            // ---
            // Global options
            // ---
            "testview -v view report.json",
            "testview view report.json --color never",
            "testview --color=always watch",
            "testview --config-file custom.toml fetch nightly",
            "TESTVIEW_VERBOSE=true testview watch",
            "TESTVIEW_COLOR=always testview fetch nightly",
        ];

        let invalid: &[(&'static str, ErrorKind)] = &[
            // ---
            // Missing required bits
            // ---
            ("testview", DisplayHelpOnMissingArgumentOrSubcommand),
            ("testview view", MissingRequiredArgument),
            ("testview fetch", MissingRequiredArgument),
            ("testview run", MissingRequiredArgument),
            ("testview env start", MissingRequiredArgument),
            // ---
            // Bad values
            // ---
            ("testview explode", InvalidSubcommand),
            ("testview env restart alpha", InvalidValue),
            ("testview view report.json --filter everything", InvalidValue),
            ("testview view report.json --show-empty perhaps", InvalidValue),
            ("testview view report.json --color sometimes", InvalidValue),
            ("testview watch --poll-interval 0s", ValueValidation),
            ("testview watch --poll-interval fast", ValueValidation),
            ("testview watch --unknown-flag", UnknownArgument),
        ];

        // Unset all TESTVIEW_ env vars because they can conflict with the
        // try_parse_from below.
        for (k, _) in std::env::vars() {
            if k.starts_with("TESTVIEW_") {
                // SAFETY: no other test in this binary mutates or reads
                // these variables concurrently.
                unsafe { std::env::remove_var(k) };
            }
        }

        for valid_args in valid {
            let cmd = shell_words::split(valid_args).expect("valid command line");
            // Any args in the beginning with an equals sign should be parsed
            // as environment variables.
            let env_vars: Vec<_> = cmd
                .iter()
                .take_while(|arg| arg.contains('='))
                .cloned()
                .collect();

            let mut env_keys = Vec::with_capacity(env_vars.len());
            for k_v in &env_vars {
                let (k, v) = k_v.split_once('=').expect("valid env var");
                // SAFETY: see above.
                unsafe { std::env::set_var(k, v) };
                env_keys.push(k);
            }

            let cmd = cmd.iter().skip(env_vars.len());

            if let Err(error) = TestviewApp::try_parse_from(cmd) {
                panic!("{valid_args} should have successfully parsed, but didn't: {error}");
            }

            for &k in &env_keys {
                // SAFETY: see above.
                unsafe { std::env::remove_var(k) };
            }
        }

        for &(invalid_args, kind) in invalid {
            match TestviewApp::try_parse_from(
                shell_words::split(invalid_args).expect("valid command"),
            ) {
                Ok(_) => {
                    panic!("{invalid_args} should have errored out but successfully parsed");
                }
                Err(error) => {
                    let actual_kind = error.kind();
                    if kind != actual_kind {
                        panic!(
                            "{invalid_args} should error with kind {kind:?}, \
                             but actual kind was {actual_kind:?}",
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn display_flags_override_config_defaults() {
        let config = ViewerConfig::load(None).expect("defaults load");
        let app = TestviewApp::try_parse_from([
            "testview",
            "view",
            "report.json",
            "--filter",
            "fail",
            "--show-time",
            "true",
        ])
        .expect("args parse");
        let Command::View(opts) = app.command else {
            panic!("view command expected");
        };

        let query = opts.display.view_query(&config);
        assert_eq!(query.filter, FilterMode::Fail);
        assert!(query.display.display_time);
        // Untouched toggles keep their configured values.
        assert!(query.display.display_empty);
        assert!(query.display.display_skipped);
        assert!(!query.display.display_tags);
    }

    #[test]
    fn targets_prepend_the_report_root() {
        let path = target_path("nightly", "alpha/suite-1");
        assert_eq!(path.segments(), &["nightly", "alpha", "suite-1"]);

        let path = target_path("nightly", "alpha//suite-1/");
        assert_eq!(path.segments(), &["nightly", "alpha", "suite-1"]);
    }

    #[test]
    fn view_command_renders_the_selected_level() {
        let mut ok = CaseReport::new("ok", "ok");
        ok.set_status(Status::Passed);
        let mut broken = CaseReport::new("broken", "broken");
        broken.set_status(Status::Failed);

        let mut suite = GroupReport::new("suite-1", "suite-1");
        suite
            .add_entry(ReportEntry::Case(ok))
            .add_entry(ReportEntry::Case(broken));
        let mut test = GroupReport::new("alpha", "alpha");
        test.add_entry(ReportEntry::Suite(suite));
        let mut report = TestReport::new("nightly", "nightly");
        report.add_entry(ReportEntry::Test(test));

        let mut file = NamedUtf8TempFile::new().expect("temp file created");
        let data = serde_json::to_string(&report).expect("report serializes");
        file.write_all(data.as_bytes()).expect("temp file written");

        let app = TestviewApp::try_parse_from([
            "testview",
            "view",
            file.path().as_str(),
            "--select",
            "alpha/suite-1",
            "--filter",
            "fail",
            "--color",
            "never",
        ])
        .expect("args parse");

        let mut writer = OutputWriter::Test { stdout: Vec::new() };
        app.exec(&mut writer).expect("view succeeds");

        let OutputWriter::Test { stdout } = writer else {
            panic!("test writer expected");
        };
        let rendered = String::from_utf8(stdout).expect("output is utf-8");
        let expected = concat!(
            "      FAILED nightly: 1 of 2 passed\n",
            "          at nightly > alpha > suite-1\n",
            "      FAILED broken\n",
        );
        assert_eq!(rendered, expected);
    }
}
