mod reports;
mod scenario;

use anyhow::{Context, Result, ensure};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use l7r_engine::constants::{DEFAULT_MAX_ROUNDS, DEFAULT_ODDS_SAMPLES};
use l7r_engine::group::Roster;
use l7r_engine::simulation::{SimulationConfig, SimulationReport, run_simulation};
use scenario::{list_scenarios, load_scenario};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored summary for terminals
    Console,
    /// Full outcomes and summary as JSON
    Json,
    /// Summary tables as markdown
    Markdown,
    /// One row of features per trial
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "l7r-sim", version)]
#[command(about = "Monte Carlo duel simulator for the L7R combat engine")]
struct Args {
    /// Built-in scenario name or path to a scenario JSON file
    #[arg(long, default_value = "mirror")]
    scenario: String,

    /// List the built-in scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Number of independent trials
    #[arg(long, default_value_t = 100)]
    trials: u32,

    /// Base seed; trial i draws from its own stream derived from it
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Rounds fought before a trial is declared a tie
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: u32,

    /// Samples per dice pool for the roll odds tables
    #[arg(long, default_value_t = DEFAULT_ODDS_SAMPLES)]
    odds_samples: usize,

    /// Worker threads; outcomes do not depend on this
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Print one line per trial in the console report
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fail unless the test group wins at least this fraction of trials
    #[arg(long)]
    expect_test_win_rate: Option<f64>,
}

impl Args {
    fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig::new(self.trials, self.seed)
            .with_max_rounds(self.max_rounds)
            .with_odds_samples(self.odds_samples)
            .with_workers(self.workers)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    if args.report == ReportFormat::Console {
        announce_banner();
    }

    let scenario = load_scenario(&args.scenario)?;
    let roster = Roster::from_groups(scenario.groups)
        .with_context(|| format!("invalid characters in scenario {}", scenario.name))?;
    let start_time = Instant::now();
    let report = run_simulation(&roster, &args.simulation_config())
        .with_context(|| format!("simulation of {} failed", scenario.name))?;

    write_report(&args, &scenario.name, &roster, &report, start_time)?;
    check_expectations(&args, &report)
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:12} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "⚔️  L7R Combat Simulator".bright_cyan().bold());
    println!("{}", "========================".cyan());
}

fn write_report(
    args: &Args,
    scenario: &str,
    roster: &Roster,
    report: &SimulationReport,
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Json => {
            reports::generate_json_report(&mut output_target, scenario, roster, report)?;
        }
        ReportFormat::Markdown => {
            reports::generate_markdown_report(&mut output_target, scenario, roster, report)?;
        }
        ReportFormat::Csv => reports::generate_csv_report(&mut output_target, &report.outcomes)?,
        ReportFormat::Console => reports::generate_console_report(
            &mut output_target,
            scenario,
            roster,
            report,
            args.verbose,
            start_time.elapsed(),
        )?,
    }
    output_target.flush_inner()?;
    Ok(())
}

fn check_expectations(args: &Args, report: &SimulationReport) -> Result<()> {
    if let Some(minimum) = args.expect_test_win_rate {
        let observed = report.summary.test_win_rate;
        ensure!(
            observed >= minimum,
            "test group won {:.1}% of {} trials, expected at least {:.1}%",
            observed * 100.0,
            report.summary.trials,
            minimum * 100.0
        );
    }
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
