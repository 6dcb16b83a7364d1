mod catalog;
mod config;
mod logs;
mod reports;
mod runner;
mod util;

use anyhow::{Context, Result};
use bankqa_core::{Catalog, Dashboard, RunRecord, Scorecard};
use bankqa_logs::{HttpRecordFetcher, LogSource};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog::{expand_selection, list_scenarios, load_catalog};
use config::TesterConfig;
use logs::{LogQuery, SourceReport, inspect_logs};
use reports::Report;
use util::{parse_marks, parse_sources, split_csv};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestMode {
    /// Play catalog scenarios and print the scorecard
    Scenarios,
    /// Fetch and filter the backend log feeds
    Logs,
    /// Do both
    Both,
}

impl TestMode {
    const fn runs_scenarios(self) -> bool {
        matches!(self, Self::Scenarios | Self::Both)
    }

    const fn runs_logs(self) -> bool {
        matches!(self, Self::Logs | Self::Both)
    }
}

#[derive(Debug, Parser)]
#[command(name = "bankqa-tester", version)]
#[command(about = "Banking QA dashboard from the command line: scenario playback, scorecards and log inspection")]
struct Args {
    /// What to run
    #[arg(long, value_enum, default_value_t = TestMode::Scenarios)]
    mode: TestMode,

    /// Tests or catalog nodes to play (comma-separated, or "all")
    #[arg(long, default_value = "functional")]
    scenarios: String,

    /// List all tests in the catalog and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Catalog JSON file (defaults to the built-in banking catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Settings JSON file ({"player": {...}, "logs": {...}})
    #[arg(long)]
    config: Option<PathBuf>,

    /// Set results before playback, e.g. FT-LOGIN-01=pass,xb-input-safari=partial
    #[arg(long)]
    mark: Option<String>,

    /// Toggle these tests once each, in order (comma-separated)
    #[arg(long)]
    toggle: Option<String>,

    /// Milliseconds between playback steps
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Backend base URL for the log feeds
    #[arg(long)]
    api_base: Option<String>,

    /// Per-feed request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log feeds to fetch (audit,operation,session,notification or all)
    #[arg(long, default_value = "all")]
    sources: String,

    /// Case-insensitive text search across every field
    #[arg(long, default_value = "")]
    search: String,

    /// Earliest day to include (YYYY-MM-DD)
    #[arg(long)]
    date_from: Option<String>,

    /// Latest day to include (YYYY-MM-DD), inclusive of the whole day
    #[arg(long)]
    date_to: Option<String>,

    /// Category value (audit action, operation status, notification type)
    #[arg(long)]
    filter: Option<String>,

    /// Maximum log rows per feed in console and markdown reports
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Show every playback step
    #[arg(short, long)]
    verbose: bool,

    /// Exit non-zero when any scored test failed or any feed could not be fetched
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = TesterConfig::load(args.config.as_deref())?.with_overrides(
        args.tick_ms,
        args.api_base.as_deref(),
        args.timeout_ms,
    );
    let catalog = load_catalog(args.catalog.as_deref())?;

    if maybe_list_scenarios(&args, &catalog)? {
        return Ok(());
    }

    announce_banner();
    let start_time = Instant::now();

    let mut dashboard = Dashboard::new(catalog, config.player.clone());
    let history = run_scenario_phase(&args, &mut dashboard).await?;
    let scorecard = args.mode.runs_scenarios().then(|| dashboard.scorecard().clone());
    let log_reports = run_log_phase(&args, &config).await?;

    write_reports(
        &args,
        scorecard.as_ref(),
        &history,
        &log_reports,
        start_time.elapsed(),
    )?;

    if args.strict && has_failures(scorecard.as_ref(), &log_reports) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args, catalog: &Catalog) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (id, title) in list_scenarios(catalog) {
        writeln!(output_target.writer(), "  {id:20} - {title}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🏦 Banking QA Tester".bright_cyan().bold());
    println!("{}", "====================".cyan());
}

async fn run_scenario_phase(args: &Args, dashboard: &mut Dashboard) -> Result<Vec<RunRecord>> {
    if !args.mode.runs_scenarios() {
        return Ok(Vec::new());
    }

    if let Some(marks) = &args.mark {
        let marks = parse_marks(marks).context("invalid --mark")?;
        for id in runner::apply_marks(dashboard, &marks) {
            eprintln!("⚠️  Unknown test in --mark: {}", id.yellow());
        }
    }
    if let Some(toggles) = &args.toggle {
        for id in runner::apply_toggles(dashboard, &split_csv(toggles)) {
            eprintln!("⚠️  Unknown test in --toggle: {}", id.yellow());
        }
    }

    let (ids, unknown) = expand_selection(dashboard.catalog(), &split_csv(&args.scenarios));
    for token in unknown {
        eprintln!("⚠️  Unknown scenario: {}", token.yellow());
    }
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    println!("{}", "🧪 Playing Scenarios".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());
    Ok(runner::play_scenarios(dashboard, &ids, args.verbose).await)
}

fn log_query(args: &Args) -> LogQuery {
    LogQuery {
        search: args.search.clone(),
        date_from: args.date_from.clone(),
        date_to: args.date_to.clone(),
        category: args.filter.clone(),
    }
}

async fn run_log_phase(args: &Args, config: &TesterConfig) -> Result<Vec<SourceReport>> {
    if !args.mode.runs_logs() {
        return Ok(Vec::new());
    }
    let sources: Vec<LogSource> = parse_sources(&args.sources)?;
    if sources.is_empty() {
        return Ok(Vec::new());
    }

    println!("{}", "📡 Fetching Log Feeds".bright_blue().bold());
    println!("{}", "-".repeat(30).blue());
    let fetcher = HttpRecordFetcher::new(config.logs.clone())
        .context("failed to create log feed client")?;
    let reports = inspect_logs(Arc::new(fetcher), &sources, &log_query(args)).await;
    for report in &reports {
        match &report.error {
            Some(err) if report.retryable => {
                eprintln!("❌ {}: {err} (transient, rerun to retry)", report.label.red());
            }
            Some(err) => eprintln!("❌ {}: {err}", report.label.red()),
            None => println!("✅ {}: {} records", report.label.green(), report.fetched),
        }
    }
    Ok(reports)
}

fn has_failures(scorecard: Option<&Scorecard>, log_reports: &[SourceReport]) -> bool {
    scorecard.is_some_and(|card| card.overall().failed > 0)
        || log_reports.iter().any(SourceReport::failed)
}

fn write_reports(
    args: &Args,
    scorecard: Option<&Scorecard>,
    history: &[RunRecord],
    log_reports: &[SourceReport],
    duration: Duration,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let report = Report {
        generated_at: chrono::Utc::now().to_rfc3339(),
        scorecard,
        history,
        logs: log_reports,
        duration,
    };

    match args.report.as_str() {
        "json" => reports::generate_json_report(output_target.writer(), &report)?,
        "markdown" => {
            reports::generate_markdown_report(output_target.writer(), &report, args.limit)?;
        }
        _ => {
            reports::generate_console_report(output_target.writer(), &report, args.limit)?;
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankqa_core::{PlayerConfig, TestStatus};
    use bankqa_logs::SourceSummary;

    fn base_args() -> Args {
        Args {
            mode: TestMode::Scenarios,
            scenarios: "transfer".to_string(),
            list_scenarios: false,
            catalog: None,
            config: None,
            mark: None,
            toggle: None,
            tick_ms: Some(1),
            api_base: None,
            timeout_ms: None,
            sources: "all".to_string(),
            search: String::new(),
            date_from: None,
            date_to: None,
            filter: None,
            limit: 20,
            report: "json".to_string(),
            output: None,
            verbose: false,
            strict: false,
        }
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(
            catalog::sample_catalog().unwrap(),
            PlayerConfig {
                tick_interval_ms: 1,
            },
        )
    }

    fn failed_feed() -> SourceReport {
        SourceReport {
            source: LogSource::Audit,
            label: LogSource::Audit.label(),
            status: "failed",
            error: Some("HTTP 500: Failed to fetch Audit Log".to_string()),
            retryable: true,
            fetched: 0,
            summary: SourceSummary::default(),
            active_sessions: None,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    #[test]
    fn clap_accepts_documented_flags() {
        let args = Args::try_parse_from([
            "bankqa-tester",
            "--mode",
            "both",
            "--mark",
            "FT-LOGIN-01=pass",
            "--sources",
            "audit,session",
            "--date-from",
            "2026-02-01",
            "--filter",
            "LOGIN",
            "--report",
            "markdown",
            "--strict",
        ])
        .unwrap();
        assert_eq!(args.mode, TestMode::Both);
        assert!(args.strict);
        assert_eq!(args.date_from.as_deref(), Some("2026-02-01"));
        assert!(Args::try_parse_from(["bankqa-tester", "--report", "csv"]).is_err());
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = std::env::temp_dir().join("bankqa-scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        let catalog = catalog::sample_catalog().unwrap();
        assert!(maybe_list_scenarios(&args, &catalog).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("FT-TRF-02"));
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        let catalog = catalog::sample_catalog().unwrap();
        assert!(!maybe_list_scenarios(&base_args(), &catalog).unwrap());
    }

    #[test]
    fn scenario_phase_applies_marks_then_plays() {
        let args = Args {
            mark: Some("SEC-01=fail".to_string()),
            toggle: Some("xb-input-chrome".to_string()),
            ..base_args()
        };
        let mut dash = dashboard();
        let history = tokio_test::block_on(run_scenario_phase(&args, &mut dash)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(dash.status("SEC-01"), TestStatus::Fail);
        assert_eq!(dash.status("xb-input-chrome"), TestStatus::Pass);
        assert_eq!(dash.status("FT-TRF-02"), TestStatus::Fail);
    }

    #[test]
    fn scenario_phase_rejects_bad_marks() {
        let args = Args {
            mark: Some("SEC-01".to_string()),
            ..base_args()
        };
        let mut dash = dashboard();
        assert!(tokio_test::block_on(run_scenario_phase(&args, &mut dash)).is_err());
    }

    #[test]
    fn phases_skip_when_not_enabled() {
        let args = Args {
            mode: TestMode::Logs,
            ..base_args()
        };
        let mut dash = dashboard();
        let history = tokio_test::block_on(run_scenario_phase(&args, &mut dash)).unwrap();
        assert!(history.is_empty());

        let args = base_args();
        let reports =
            tokio_test::block_on(run_log_phase(&args, &TesterConfig::default())).unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn strict_failures() {
        let mut dash = dashboard();
        assert!(!has_failures(Some(dash.scorecard()), &[]));
        dash.set("FT-BILL-01", TestStatus::Fail);
        assert!(has_failures(Some(dash.scorecard()), &[]));
        assert!(has_failures(None, &[failed_feed()]));
    }

    #[test]
    fn write_reports_emits_json() {
        let temp = std::env::temp_dir().join("bankqa-report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        let mut dash = dashboard();
        let card = dash.scorecard().clone();
        write_reports(&args, Some(&card), &[], &[failed_feed()], Duration::ZERO).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["scorecard"]["root"]["id"], "bankqa");
        assert_eq!(value["logs"][0]["status"], "failed");
    }

    #[test]
    fn write_reports_emits_console_summary() {
        let temp = std::env::temp_dir().join("bankqa-report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, None, &[], &[], Duration::ZERO).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Nothing to report"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
