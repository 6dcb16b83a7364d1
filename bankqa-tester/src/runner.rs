//! Drives the dashboard: direct marks, toggles and scenario playback.
use bankqa_core::{Dashboard, DashboardError, Progress, RunRecord, TestStatus};
use colored::Colorize;

/// Set statuses directly. Returns ids that are not in the catalog.
pub fn apply_marks(dashboard: &mut Dashboard, marks: &[(String, TestStatus)]) -> Vec<String> {
    let mut unknown = Vec::new();
    for (id, status) in marks {
        if dashboard.catalog().find_test(id).is_none() {
            unknown.push(id.clone());
            continue;
        }
        dashboard.set(id, *status);
        log::debug!("marked {id} as {status}");
    }
    unknown
}

/// Toggle each id once, in order. Returns ids that are not in the catalog.
pub fn apply_toggles(dashboard: &mut Dashboard, ids: &[String]) -> Vec<String> {
    let mut unknown = Vec::new();
    for id in ids {
        if dashboard.catalog().find_test(id).is_none() {
            unknown.push(id.clone());
            continue;
        }
        let status = dashboard.toggle(id);
        log::debug!("toggled {id} to {status}");
    }
    unknown
}

fn status_line(status: TestStatus) -> colored::ColoredString {
    match status {
        TestStatus::Pass => "✅ PASS".green(),
        TestStatus::Fail => "❌ FAIL".red(),
        TestStatus::Partial => "🟡 PARTIAL".yellow(),
        TestStatus::Untested => "⬜ UNTESTED".dimmed(),
    }
}

/// Play each scenario to completion, one at a time.
pub async fn play_scenarios(
    dashboard: &mut Dashboard,
    ids: &[String],
    verbose: bool,
) -> Vec<RunRecord> {
    let mut records = Vec::new();
    for id in ids {
        let steps = dashboard
            .catalog()
            .find_test(id)
            .map(|test| test.steps.clone())
            .unwrap_or_default();
        let show_step = |progress: &Progress| {
            if !verbose {
                return;
            }
            let step = progress
                .current_step
                .checked_sub(1)
                .and_then(|i| steps.get(i))
                .map_or("", String::as_str);
            println!(
                "   [{:>3}%] step {}/{} {}",
                progress.percent, progress.current_step, progress.step_count, step
            );
        };
        println!("▶ {}", id.bold());
        match dashboard.play(id, show_step).await {
            Ok(Some(record)) => {
                println!(
                    "{} {} - {:?}",
                    status_line(record.terminal_status),
                    record.label,
                    record.elapsed
                );
                records.push(record);
            }
            Ok(None) => eprintln!("⚠️  {} was not played", id.yellow()),
            Err(DashboardError::UnknownTest(_) | DashboardError::UnknownNode(_)) => {
                eprintln!("⚠️  Unknown scenario: {}", id.yellow());
            }
        }
    }
    records
}
