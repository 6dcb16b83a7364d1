use anyhow::Result;
use bankqa_core::{NodeKind, NodeScore, RunRecord, Scorecard, TestStatus};
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use crate::logs::SourceReport;

/// Everything one invocation produced.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scorecard: Option<&'a Scorecard>,
    pub history: &'a [RunRecord],
    pub logs: &'a [SourceReport],
    #[serde(rename = "duration_ms", serialize_with = "duration_ms")]
    pub duration: Duration,
}

fn duration_ms<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

impl Report<'_> {
    pub fn is_empty(&self) -> bool {
        self.scorecard.is_none() && self.history.is_empty() && self.logs.is_empty()
    }
}

pub fn generate_json_report(out: &mut dyn Write, report: &Report<'_>) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

fn status_badge(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Pass => "✅",
        TestStatus::Fail => "❌",
        TestStatus::Partial => "🟡",
        TestStatus::Untested => "⬜",
    }
}

fn score_line(node: &NodeScore) -> String {
    let s = node.score;
    format!(
        "{}/{} passed, {} failed, {} partial, {} untested",
        s.passed,
        s.total,
        s.failed,
        s.partial,
        s.untested()
    )
}

pub fn generate_console_report(
    out: &mut dyn Write,
    report: &Report<'_>,
    row_limit: usize,
) -> Result<()> {
    if let Some(card) = report.scorecard {
        writeln!(out)?;
        writeln!(out, "{}", "📊 Scorecard".bright_cyan().bold())?;
        writeln!(out, "{}", "============".cyan())?;
        write_console_node(out, &card.root, 0)?;
        writeln!(out)?;
    }

    if !report.history.is_empty() {
        writeln!(out, "{}", "🕑 Run History (newest first)".bright_yellow().bold())?;
        writeln!(out, "{}", "=============================".yellow())?;
        for record in report.history.iter().rev() {
            writeln!(
                out,
                "{} {:14} {:45} {:?}",
                status_badge(record.terminal_status),
                record.test_id,
                record.label,
                record.elapsed
            )?;
        }
        writeln!(out)?;
    }

    for source in report.logs {
        write_console_source(out, source, row_limit)?;
    }

    if report.is_empty() {
        writeln!(out, "Nothing to report.")?;
    }
    Ok(())
}

fn write_console_node(out: &mut dyn Write, node: &NodeScore, depth: usize) -> Result<()> {
    let pct = format!("{:>3}%", node.percentage);
    let pct = match node.percentage {
        80.. => pct.green(),
        50..=79 => pct.yellow(),
        _ if node.score.tested() == 0 => pct.dimmed(),
        _ => pct.red(),
    };
    let indent = "  ".repeat(depth);
    let title = if node.kind == NodeKind::Application || node.kind == NodeKind::Tab {
        node.title.bold()
    } else {
        node.title.normal()
    };
    writeln!(out, "{indent}{title} {pct}  {}", score_line(node))?;
    if node.kind == NodeKind::Category {
        return Ok(());
    }
    for child in &node.children {
        write_console_node(out, child, depth + 1)?;
    }
    Ok(())
}

fn write_console_source(out: &mut dyn Write, source: &SourceReport, row_limit: usize) -> Result<()> {
    writeln!(out, "{}", format!("📜 {}", source.label).bright_blue().bold())?;
    writeln!(out, "{}", "-".repeat(30).blue())?;
    if let Some(err) = &source.error {
        writeln!(out, "{} {err}", "❌".red())?;
        writeln!(out, "   rerun to retry this feed")?;
        writeln!(out)?;
        return Ok(());
    }
    let summary = source.summary;
    writeln!(
        out,
        "{} fetched, {} shown ({} succeeded, {} failed)",
        source.fetched,
        summary.total,
        summary.succeeded.to_string().green(),
        summary.failed.to_string().red()
    )?;
    if let Some(active) = source.active_sessions {
        writeln!(out, "Active sessions: {active}")?;
    }
    if !source.rows.is_empty() {
        writeln!(out, "{}", source.columns.join(" | ").bold())?;
        for row in source.rows.iter().take(row_limit) {
            writeln!(out, "{}", row.join(" | "))?;
        }
        if source.rows.len() > row_limit {
            writeln!(out, "… {} more", source.rows.len() - row_limit)?;
        }
    }
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(
    out: &mut dyn Write,
    report: &Report<'_>,
    row_limit: usize,
) -> Result<()> {
    writeln!(out, "# Banking QA Report\n")?;
    writeln!(out, "_Generated {}_\n", report.generated_at)?;

    if report.is_empty() {
        writeln!(out, "_Nothing to report._")?;
        return Ok(());
    }

    if let Some(card) = report.scorecard {
        writeln!(out, "## Scorecard\n")?;
        writeln!(out, "| Area | Passed | Failed | Partial | Untested | Score |")?;
        writeln!(out, "|---|---|---|---|---|---|")?;
        write_markdown_node(out, &card.root, 0)?;
        writeln!(out)?;
    }

    if !report.history.is_empty() {
        writeln!(out, "## Run History\n")?;
        writeln!(out, "| Test | Scenario | Result | Elapsed |")?;
        writeln!(out, "|---|---|---|---|")?;
        for record in report.history.iter().rev() {
            writeln!(
                out,
                "| {} | {} | {} {} | {} ms |",
                record.test_id,
                escape_cell(&record.label),
                status_badge(record.terminal_status),
                record.terminal_status,
                record.elapsed.as_millis()
            )?;
        }
        writeln!(out)?;
    }

    for source in report.logs {
        writeln!(out, "## {}\n", source.label)?;
        if let Some(err) = &source.error {
            writeln!(out, "❌ {err}\n")?;
            continue;
        }
        writeln!(
            out,
            "- **Fetched**: {}\n- **Shown**: {}\n- **Succeeded**: {}\n- **Failed**: {}\n",
            source.fetched, source.summary.total, source.summary.succeeded, source.summary.failed
        )?;
        if source.rows.is_empty() {
            writeln!(out, "_No matching records._\n")?;
            continue;
        }
        writeln!(out, "| {} |", source.columns.join(" | "))?;
        writeln!(out, "|{}", "---|".repeat(source.columns.len()))?;
        for row in source.rows.iter().take(row_limit) {
            let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
            writeln!(out, "| {} |", cells.join(" | "))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_markdown_node(out: &mut dyn Write, node: &NodeScore, depth: usize) -> Result<()> {
    let s = node.score;
    writeln!(
        out,
        "| {}{} | {} | {} | {} | {} | {}% |",
        "&nbsp;&nbsp;".repeat(depth),
        escape_cell(&node.title),
        s.passed,
        s.failed,
        s.partial,
        s.untested(),
        node.percentage
    )?;
    if node.kind == NodeKind::Component || node.kind == NodeKind::Category {
        return Ok(());
    }
    for child in &node.children {
        write_markdown_node(out, child, depth + 1)?;
    }
    Ok(())
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
