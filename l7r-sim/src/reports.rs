use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use l7r_engine::group::{Roster, Side};
use l7r_engine::simulation::SimulationReport;
use l7r_engine::summary::{FeatureSummary, SimulationSummary};
use l7r_engine::trial::TrialOutcome;

/// Feature names shown in the console and markdown tables.
const HEADLINE_FEATURES: &[&str] = &[
    "duration_rounds",
    "duration_phases",
    "control_survivors",
    "control_sw",
    "control_vp_spent",
    "test_survivors",
    "test_sw",
    "test_vp_spent",
];

fn group_label(roster: &Roster, side: Side) -> String {
    format!("{} ({})", roster.group_name(side), roster.names(side).join(", "))
}

fn headline(summary: &SimulationSummary) -> impl Iterator<Item = &FeatureSummary> {
    HEADLINE_FEATURES
        .iter()
        .filter_map(|name| summary.feature(name))
}

pub fn generate_console_report(
    out: &mut impl Write,
    scenario: &str,
    roster: &Roster,
    report: &SimulationReport,
    verbose: bool,
    total_duration: Duration,
) -> Result<()> {
    let summary = &report.summary;
    writeln!(out)?;
    writeln!(out, "{}", "📊 Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;
    writeln!(out, "Scenario: {}", scenario.bold())?;
    writeln!(out, "Control: {}", group_label(roster, Side::Control))?;
    writeln!(out, "Test:    {}", group_label(roster, Side::Test))?;
    writeln!(
        out,
        "Trials: {} (seed {}, max {} rounds)",
        summary.trials, report.config.seed, report.config.max_rounds
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "Test wins:    {} ({})",
        summary.test_wins,
        format!("{:.1}%", summary.test_win_rate * 100.0).green()
    )?;
    writeln!(
        out,
        "Control wins: {} ({})",
        summary.control_wins,
        format!("{:.1}%", summary.control_win_rate * 100.0).red()
    )?;
    writeln!(
        out,
        "Ties:         {} ({:.1}%)",
        summary.ties,
        summary.tie_rate * 100.0
    )?;
    writeln!(out)?;

    writeln!(out, "{}", "📈 Feature Means".bright_yellow().bold())?;
    writeln!(out, "{}", "================".yellow())?;
    writeln!(
        out,
        "{:24} {:>10} {:>12} {:>12}",
        "feature", "overall", "test wins", "control wins"
    )?;
    for feature in headline(summary) {
        writeln!(
            out,
            "{:24} {:>10.2} {:>12.2} {:>12.2}",
            feature.name,
            feature.overall.mean(),
            feature.given_test_victory.mean(),
            feature.given_control_victory.mean()
        )?;
    }

    if verbose {
        writeln!(out)?;
        writeln!(out, "{}", "🎲 Trials".bright_blue().bold())?;
        for outcome in &report.outcomes {
            writeln!(out, "{}", trial_line(outcome))?;
        }
    }
    writeln!(out)?;
    writeln!(out, "Simulation time: {total_duration:?}")?;
    Ok(())
}

fn trial_line(outcome: &TrialOutcome) -> String {
    let result = match outcome.winner() {
        Some(Side::Test) => "test".green(),
        Some(Side::Control) => "control".red(),
        None => "tie".yellow(),
    };
    let fallen: Vec<&str> = outcome
        .characters
        .iter()
        .filter(|record| !record.survived)
        .map(|record| record.name.as_str())
        .collect();
    format!(
        "  #{:<5} {:8} {:>3} rounds {:>4} phases  fallen: {}",
        outcome.index,
        result,
        outcome.rounds,
        outcome.phases,
        if fallen.is_empty() { "-".to_string() } else { fallen.join(", ") }
    )
}

#[derive(Serialize)]
struct JsonReport<'a> {
    scenario: &'a str,
    control_group: &'a str,
    test_group: &'a str,
    #[serde(flatten)]
    report: &'a SimulationReport,
}

pub fn generate_json_report(
    out: &mut impl Write,
    scenario: &str,
    roster: &Roster,
    report: &SimulationReport,
) -> Result<()> {
    let document = JsonReport {
        scenario,
        control_group: roster.group_name(Side::Control),
        test_group: roster.group_name(Side::Test),
        report,
    };
    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(
    out: &mut impl Write,
    scenario: &str,
    roster: &Roster,
    report: &SimulationReport,
) -> Result<()> {
    let summary = &report.summary;
    writeln!(out, "# L7R Simulation: {scenario}\n")?;
    writeln!(out, "- Control: {}", group_label(roster, Side::Control))?;
    writeln!(out, "- Test: {}", group_label(roster, Side::Test))?;
    writeln!(out, "- Trials: {} (seed {})\n", summary.trials, report.config.seed)?;
    writeln!(out, "| Result | Count | Rate |")?;
    writeln!(out, "|---|---|---|")?;
    for (label, count, rate) in [
        ("Test wins", summary.test_wins, summary.test_win_rate),
        ("Control wins", summary.control_wins, summary.control_win_rate),
        ("Ties", summary.ties, summary.tie_rate),
    ] {
        writeln!(out, "| {label} | {count} | {:.1}% |", rate * 100.0)?;
    }
    writeln!(out, "\n## Feature means\n")?;
    writeln!(out, "| Feature | Overall | Given test win | Given control win |")?;
    writeln!(out, "|---|---|---|---|")?;
    for feature in &summary.features {
        writeln!(
            out,
            "| {} | {:.3} | {:.3} | {:.3} |",
            feature.name,
            feature.overall.mean(),
            feature.given_test_victory.mean(),
            feature.given_control_victory.mean()
        )?;
    }
    Ok(())
}

/// One row per trial with every outcome feature as a column.
pub fn generate_csv_report(out: &mut impl Write, outcomes: &[TrialOutcome]) -> Result<()> {
    let Some(first) = outcomes.first() else {
        writeln!(out, "trial")?;
        return Ok(());
    };
    let header: Vec<String> = first.features().into_iter().map(|(name, _)| name).collect();
    writeln!(out, "trial,{}", header.join(","))?;
    for outcome in outcomes {
        let values: Vec<String> = outcome
            .features()
            .into_iter()
            .map(|(_, value)| value.to_string())
            .collect();
        writeln!(out, "{},{}", outcome.index, values.join(","))?;
    }
    Ok(())
}
